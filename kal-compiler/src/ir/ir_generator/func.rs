use crate::ast::{FunctionDef, PrototypeKind};
use crate::ir::builder::Builder;
use crate::ir::FuncId;
use crate::{CompileError, SemanticErrorKind};

use super::context::Lowerer;

impl<B: Builder> Lowerer<'_, B> {
    /// Lower a `def` (or an anonymous top-level wrapper, which takes the same
    /// path). On failure the emitted function is erased and, for operator
    /// definitions, the precedence table is put back exactly as it was.
    pub fn lower_definition(&mut self, def: &FunctionDef) -> Result<FuncId, CompileError> {
        let proto = &def.proto;
        self.protos.put(proto.name.clone(), proto.clone());

        // Install the operator before the body so recursive uses inside the
        // definition resolve; remember what it displaced for rollback.
        let installed = match proto.kind {
            PrototypeKind::BinaryOp { op, precedence } => {
                Some((op, self.ops.install(op, precedence as i32)))
            }
            _ => None,
        };

        let result = self.lower_function_body(def);
        if result.is_err() {
            if let Some((op, previous)) = installed {
                self.ops.restore(op, previous);
            }
        }
        result
    }

    fn lower_function_body(&mut self, def: &FunctionDef) -> Result<FuncId, CompileError> {
        let proto = &def.proto;
        // Materialize or locate the IR function; while it is still a bare
        // declaration this also refreshes its parameter list to this `def`.
        let func = self.lower_prototype(proto);

        if self.builder.is_defined(func) {
            return Err(self.error(
                SemanticErrorKind::Redefinition,
                proto.loc,
                format!("Function '{}' cannot be redefined", proto.name),
            ));
        }

        self.builder.enter_function(func);
        let entry = self.builder.append_block("entry");
        self.builder.position_at_end(entry);

        self.symbols.clear();
        let emitted = self.bind_parameters(def, func).and_then(|()| {
            let ret = self.lower_expr(&def.body)?;
            self.builder.ret(ret);
            Ok(())
        });
        if let Err(error) = emitted {
            self.builder.erase_function(func);
            return Err(error);
        }

        if let Err(message) = self.builder.verify_function(func) {
            let name = self.builder.function_name(func);
            self.builder.erase_function(func);
            return Err(CompileError::Verify {
                function: name,
                message,
            });
        }

        self.builder.optimize_function(func);
        Ok(func)
    }

    /// Give each parameter a stack slot so the body can assign to it like any
    /// other binding.
    fn bind_parameters(&mut self, def: &FunctionDef, func: FuncId) -> Result<(), CompileError> {
        for (index, param) in def.proto.params.iter().enumerate() {
            if self.symbols.lookup(param).is_some() {
                return Err(self.error(
                    SemanticErrorKind::ParameterRedefinition,
                    def.proto.loc,
                    format!("Parameter '{param}' defined multiple times"),
                ));
            }
            let slot = self.builder.stack_slot(param);
            let value = self.builder.param_value(func, index);
            self.builder.store(slot, value);
            self.symbols.push(param, slot);
        }
        Ok(())
    }
}
