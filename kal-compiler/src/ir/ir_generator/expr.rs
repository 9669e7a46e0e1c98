use crate::ast::Expr;
use crate::ir::builder::Builder;
use crate::ir::{BinOp, BlockId, FcmpPred, ValueId};
use crate::{CompileError, SemanticErrorKind, SourceLocation};

use super::context::Lowerer;

impl<B: Builder> Lowerer<'_, B> {
    /// Lower one expression to exactly one SSA value.
    pub fn lower_expr(&mut self, expr: &Expr) -> Result<ValueId, CompileError> {
        match expr {
            Expr::Number(_, value) => Ok(self.builder.const_f64(*value)),

            Expr::Variable(loc, name) => match self.symbols.lookup(name) {
                Some(slot) => Ok(self.builder.load(slot)),
                None => Err(self.error(
                    SemanticErrorKind::UnknownName,
                    *loc,
                    format!("Unknown variable name '{name}'"),
                )),
            },

            Expr::Unary { loc, op, operand } => {
                let operand = self.lower_expr(operand)?;
                let name = format!("unary{op}");
                let callee = self.get_function(&name).ok_or_else(|| {
                    self.error(
                        SemanticErrorKind::UnknownOperator,
                        *loc,
                        format!("Unknown unary operator '{op}'"),
                    )
                })?;
                Ok(self.builder.call(callee, vec![operand]))
            }

            Expr::Binary { loc, op, lhs, rhs } => self.lower_binary(*loc, *op, lhs, rhs),

            Expr::Call { loc, callee, args } => {
                let func = self.get_function(callee).ok_or_else(|| {
                    self.error(
                        SemanticErrorKind::UnknownName,
                        *loc,
                        format!("Unknown function '{callee}' referenced"),
                    )
                })?;
                if self.builder.param_count(func) != args.len() {
                    return Err(self.error(
                        SemanticErrorKind::ArgCountMismatch,
                        *loc,
                        format!(
                            "'{callee}' expects {} argument(s), {} passed",
                            self.builder.param_count(func),
                            args.len()
                        ),
                    ));
                }
                // Left-to-right; argument side effects observe this order.
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.lower_expr(arg)?);
                }
                Ok(self.builder.call(func, values))
            }

            Expr::If {
                cond,
                then_expr,
                else_expr,
                ..
            } => self.lower_if(cond, then_expr, else_expr),

            Expr::For {
                var,
                start,
                end,
                step,
                body,
                ..
            } => self.lower_for(var, start, end, step.as_deref(), body),

            Expr::VarIn { bindings, body, .. } => self.lower_var_in(bindings, body),
        }
    }

    fn lower_binary(
        &mut self,
        loc: SourceLocation,
        op: char,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Result<ValueId, CompileError> {
        // Assignment is special-cased: the left side is a binding name, not a
        // value to evaluate.
        if op == '=' {
            let name = match lhs {
                Expr::Variable(_, name) => name.clone(),
                _ => {
                    return Err(self.error(
                        SemanticErrorKind::InvalidAssignTarget,
                        lhs.location(),
                        "destination of '=' must be a variable",
                    ))
                }
            };
            let value = self.lower_expr(rhs)?;
            let slot = self.symbols.lookup(&name).ok_or_else(|| {
                self.error(
                    SemanticErrorKind::UnknownName,
                    lhs.location(),
                    format!("Unknown variable name '{name}'"),
                )
            })?;
            self.builder.store(slot, value);
            // Assignment is an expression; it yields the stored value.
            return Ok(value);
        }

        let lhs = self.lower_expr(lhs)?;
        let rhs = self.lower_expr(rhs)?;
        match op {
            '+' => Ok(self.builder.binary(BinOp::Fadd, lhs, rhs)),
            '-' => Ok(self.builder.binary(BinOp::Fsub, lhs, rhs)),
            '*' => Ok(self.builder.binary(BinOp::Fmul, lhs, rhs)),
            '/' => Ok(self.builder.binary(BinOp::Fdiv, lhs, rhs)),
            '<' => {
                let flag = self.builder.fcmp(FcmpPred::Ult, lhs, rhs);
                Ok(self.builder.to_double(flag))
            }
            _ => {
                let name = format!("binary{op}");
                let callee = self.get_function(&name).ok_or_else(|| {
                    self.error(
                        SemanticErrorKind::UnknownOperator,
                        loc,
                        format!("Unknown binary operator '{op}'"),
                    )
                })?;
                Ok(self.builder.call(callee, vec![lhs, rhs]))
            }
        }
    }

    fn lower_if(
        &mut self,
        cond: &Expr,
        then_expr: &Expr,
        else_expr: &Expr,
    ) -> Result<ValueId, CompileError> {
        let cond_value = self.lower_expr(cond)?;
        let zero = self.builder.const_f64(0.0);
        let flag = self.builder.fcmp(FcmpPred::Une, cond_value, zero);

        let then_block = self.builder.append_block("then");
        let else_block = self.builder.append_block("else");
        let merge_block = self.builder.append_block("merge");
        self.builder.cond_br(flag, then_block, else_block);

        self.builder.position_at_end(then_block);
        let then_value = self.lower_expr(then_expr)?;
        self.builder.br(merge_block);
        // Lowering the arm may have moved the insertion point into a nested
        // merge; the φ edge must come from wherever it actually ended.
        let then_end = self.builder.current_block();

        self.builder.position_at_end(else_block);
        let else_value = self.lower_expr(else_expr)?;
        self.builder.br(merge_block);
        let else_end = self.builder.current_block();

        self.builder.position_at_end(merge_block);
        Ok(self
            .builder
            .phi(vec![(then_value, then_end), (else_value, else_end)]))
    }

    fn lower_for(
        &mut self,
        var: &str,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        body: &Expr,
    ) -> Result<ValueId, CompileError> {
        let slot = self.builder.stack_slot(var);
        let start_value = self.lower_expr(start)?;
        self.builder.store(slot, start_value);

        let loop_block = self.builder.append_block("loop");
        self.builder.br(loop_block);
        self.builder.position_at_end(loop_block);

        // The loop variable shadows any outer binding of the same name for
        // the duration of the loop.
        self.symbols.push(var, slot);
        let result = self.lower_for_body(slot, end, step, body, loop_block);
        self.symbols.pop(var);
        result
    }

    fn lower_for_body(
        &mut self,
        slot: ValueId,
        end: &Expr,
        step: Option<&Expr>,
        body: &Expr,
        loop_block: BlockId,
    ) -> Result<ValueId, CompileError> {
        self.lower_expr(body)?; // value discarded

        let step_value = match step {
            Some(step) => self.lower_expr(step)?,
            None => self.builder.const_f64(1.0),
        };
        let end_value = self.lower_expr(end)?;

        let current = self.builder.load(slot);
        let next = self.builder.binary(BinOp::Fadd, current, step_value);
        self.builder.store(slot, next);

        let zero = self.builder.const_f64(0.0);
        let flag = self.builder.fcmp(FcmpPred::Une, end_value, zero);
        let after_block = self.builder.append_block("afterloop");
        self.builder.cond_br(flag, loop_block, after_block);
        self.builder.position_at_end(after_block);

        // A `for` expression always yields 0.0.
        Ok(self.builder.const_f64(0.0))
    }

    fn lower_var_in(
        &mut self,
        bindings: &[(String, Option<Expr>)],
        body: &Expr,
    ) -> Result<ValueId, CompileError> {
        let mut installed = Vec::with_capacity(bindings.len());
        let result = (|| {
            for (name, init) in bindings {
                // The initializer sees the environment before this binding is
                // installed, so `var a = a in ...` reads the outer `a`.
                let init_value = match init {
                    Some(init) => self.lower_expr(init)?,
                    None => self.builder.const_f64(0.0),
                };
                let slot = self.builder.stack_slot(name);
                self.builder.store(slot, init_value);
                self.symbols.push(name, slot);
                installed.push(name.clone());
            }
            self.lower_expr(body)
        })();

        for name in installed.iter().rev() {
            self.symbols.pop(name);
        }
        result
    }
}
