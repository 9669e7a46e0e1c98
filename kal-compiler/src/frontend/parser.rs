//! Recursive-descent parser with precedence climbing.
//!
//! Expressions are parsed against an [`OperatorTable`] that starts with the
//! built-in binary operators and grows as `def binary<op>` definitions are
//! lowered. The table is consulted, never mutated, here; installation happens
//! during lowering so that an operator only becomes visible to forms after the
//! one defining it.

use std::collections::HashMap;

use crate::ast::{Expr, FunctionDef, Item, Prototype, PrototypeKind};
use crate::frontend::lexer::{Token, TokenKind};
use crate::CompileError;

/// Precedence used when a `binary` prototype omits the literal.
const DEFAULT_BINARY_PRECEDENCE: u32 = 30;

/// Binary-operator precedences, keyed by operator character.
///
/// Only entries with positive precedence act as binary operators; anything
/// else terminates an expression.
#[derive(Debug, Clone)]
pub struct OperatorTable {
    precedence: HashMap<char, i32>,
}

impl OperatorTable {
    pub fn new() -> Self {
        let mut precedence = HashMap::new();
        precedence.insert('=', 2);
        precedence.insert('<', 10);
        precedence.insert('>', 10);
        precedence.insert('-', 20);
        precedence.insert('+', 20);
        precedence.insert('*', 40);
        precedence.insert('/', 40);
        OperatorTable { precedence }
    }

    pub fn precedence(&self, op: char) -> Option<i32> {
        self.precedence.get(&op).copied().filter(|p| *p > 0)
    }

    /// Register an operator, returning any previous precedence so a failed
    /// definition can put the table back exactly as it was.
    pub fn install(&mut self, op: char, precedence: i32) -> Option<i32> {
        self.precedence.insert(op, precedence)
    }

    pub fn restore(&mut self, op: char, previous: Option<i32>) {
        match previous {
            Some(precedence) => {
                self.precedence.insert(op, precedence);
            }
            None => {
                self.precedence.remove(&op);
            }
        }
    }
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    anon_counter: u32,
}

impl Parser {
    /// The token vector must end with `Eof`, which [`crate::frontend::lexer::lex`]
    /// guarantees.
    pub fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(matches!(
            tokens.last().map(|t| &t.kind),
            Some(TokenKind::Eof)
        ));
        Parser {
            tokens,
            pos: 0,
            anon_counter: 0,
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Discard one token. The driver calls this after a parse error so the
    /// next `parse_toplevel` does not trip over the same token again.
    pub fn synchronize(&mut self) {
        self.advance();
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::Parse {
            location: self.current().loc,
            message: message.into(),
        }
    }

    /// Parse one top-level form.
    pub fn parse_toplevel(&mut self, ops: &OperatorTable) -> Result<Item, CompileError> {
        match &self.current().kind {
            TokenKind::Eof => Ok(Item::Eof),
            TokenKind::Char(';') => {
                self.advance();
                Ok(Item::Empty)
            }
            TokenKind::Def => {
                self.advance();
                let proto = self.parse_prototype()?;
                let body = self.parse_expression(ops)?;
                Ok(Item::Definition(FunctionDef { proto, body }))
            }
            TokenKind::Extern => {
                self.advance();
                Ok(Item::Extern(self.parse_prototype()?))
            }
            _ => {
                let body = self.parse_expression(ops)?;
                let name = format!("__anon_expr{}", self.anon_counter);
                self.anon_counter += 1;
                let proto = Prototype {
                    loc: body.location(),
                    name,
                    params: Vec::new(),
                    kind: PrototypeKind::Function,
                };
                Ok(Item::TopLevel(FunctionDef { proto, body }))
            }
        }
    }

    /// prototype := ident '(' ident* ')'
    ///            | 'unary' op '(' ident ')'
    ///            | 'binary' op number? '(' ident ident ')'
    fn parse_prototype(&mut self) -> Result<Prototype, CompileError> {
        let loc = self.current().loc;
        let (name, kind) = match &self.current().kind {
            TokenKind::Ident(id) => {
                let name = id.clone();
                self.advance();
                (name, PrototypeKind::Function)
            }
            TokenKind::Unary => {
                self.advance();
                let op = match self.current().kind {
                    TokenKind::Char(c) => c,
                    _ => return Err(self.error("Expected unary operator")),
                };
                self.advance();
                (format!("unary{}", op), PrototypeKind::UnaryOp(op))
            }
            TokenKind::Binary => {
                self.advance();
                let op = match self.current().kind {
                    TokenKind::Char(c) => c,
                    _ => return Err(self.error("Expected binary operator")),
                };
                self.advance();
                let precedence = match self.current().kind {
                    TokenKind::Number(n) => {
                        if !(1.0..=100.0).contains(&n) {
                            return Err(
                                self.error("Invalid precedence: must be between 1 and 100")
                            );
                        }
                        self.advance();
                        n as u32
                    }
                    _ => DEFAULT_BINARY_PRECEDENCE,
                };
                (
                    format!("binary{}", op),
                    PrototypeKind::BinaryOp { op, precedence },
                )
            }
            _ => return Err(self.error("Expected function name in prototype")),
        };

        if self.current().kind != TokenKind::Char('(') {
            return Err(self.error("Expected '(' in prototype"));
        }
        self.advance();

        let mut params = Vec::new();
        while let TokenKind::Ident(id) = &self.current().kind {
            params.push(id.clone());
            self.advance();
        }

        if self.current().kind != TokenKind::Char(')') {
            return Err(self.error("Expected ')' in prototype"));
        }
        self.advance();

        let operands = match kind {
            PrototypeKind::UnaryOp(_) => Some(1),
            PrototypeKind::BinaryOp { .. } => Some(2),
            PrototypeKind::Function => None,
        };
        if let Some(expected) = operands {
            if params.len() != expected {
                return Err(self.error("Invalid number of operands for operator"));
            }
        }

        Ok(Prototype {
            loc,
            name,
            params,
            kind,
        })
    }

    /// expression := unary (binop unary)*
    fn parse_expression(&mut self, ops: &OperatorTable) -> Result<Expr, CompileError> {
        let lhs = self.parse_unary(ops)?;
        self.parse_binop_rhs(ops, 0, lhs)
    }

    fn current_precedence(&self, ops: &OperatorTable) -> i32 {
        match self.current().kind {
            TokenKind::Char(c) if c.is_ascii() => ops.precedence(c).unwrap_or(-1),
            _ => -1,
        }
    }

    /// Left-associative precedence climbing: keep absorbing operators at or
    /// above `min_precedence`, giving each right-hand side only the operators
    /// that bind tighter.
    fn parse_binop_rhs(
        &mut self,
        ops: &OperatorTable,
        min_precedence: i32,
        mut lhs: Expr,
    ) -> Result<Expr, CompileError> {
        loop {
            let precedence = self.current_precedence(ops);
            if precedence < min_precedence {
                return Ok(lhs);
            }

            let (op, loc) = match self.current().kind {
                TokenKind::Char(c) => (c, self.current().loc),
                _ => unreachable!("precedence is only assigned to Char tokens"),
            };
            self.advance();

            let mut rhs = self.parse_unary(ops)?;
            if precedence < self.current_precedence(ops) {
                rhs = self.parse_binop_rhs(ops, precedence + 1, rhs)?;
            }

            lhs = Expr::Binary {
                loc,
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    /// unary := primary | op unary
    ///
    /// Any character token other than `(` or `,` is taken as a unary
    /// operator; unary operators chain right-associatively.
    fn parse_unary(&mut self, ops: &OperatorTable) -> Result<Expr, CompileError> {
        match self.current().kind {
            TokenKind::Char(c) if c != '(' && c != ',' => {
                let loc = self.current().loc;
                self.advance();
                let operand = self.parse_unary(ops)?;
                Ok(Expr::Unary {
                    loc,
                    op: c,
                    operand: Box::new(operand),
                })
            }
            _ => self.parse_primary(ops),
        }
    }

    fn parse_primary(&mut self, ops: &OperatorTable) -> Result<Expr, CompileError> {
        let loc = self.current().loc;
        match self.current().kind.clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(loc, n))
            }
            TokenKind::Ident(id) => {
                self.advance();
                if self.current().kind != TokenKind::Char('(') {
                    return Ok(Expr::Variable(loc, id));
                }
                self.advance();
                let mut args = Vec::new();
                if self.current().kind != TokenKind::Char(')') {
                    loop {
                        args.push(self.parse_expression(ops)?);
                        match self.current().kind {
                            TokenKind::Char(')') => break,
                            TokenKind::Char(',') => self.advance(),
                            _ => {
                                return Err(
                                    self.error("Expected ')' or ',' in argument list")
                                )
                            }
                        }
                    }
                }
                self.advance(); // eat ')'
                Ok(Expr::Call {
                    loc,
                    callee: id,
                    args,
                })
            }
            TokenKind::Char('(') => {
                self.advance();
                let inner = self.parse_expression(ops)?;
                if self.current().kind != TokenKind::Char(')') {
                    return Err(self.error("Expected ')'"));
                }
                self.advance();
                Ok(inner)
            }
            TokenKind::If => self.parse_if(ops),
            TokenKind::For => self.parse_for(ops),
            TokenKind::Var => self.parse_var(ops),
            _ => Err(self.error(format!(
                "Unknown token {} when expecting an expression",
                self.current().kind
            ))),
        }
    }

    /// ifexpr := 'if' expression 'then' expression 'else' expression
    fn parse_if(&mut self, ops: &OperatorTable) -> Result<Expr, CompileError> {
        let loc = self.current().loc;
        self.advance(); // eat 'if'

        let cond = self.parse_expression(ops)?;
        if self.current().kind != TokenKind::Then {
            return Err(self.error("Expected 'then'"));
        }
        self.advance();

        let then_expr = self.parse_expression(ops)?;
        if self.current().kind != TokenKind::Else {
            return Err(self.error("Expected 'else'"));
        }
        self.advance();

        let else_expr = self.parse_expression(ops)?;
        Ok(Expr::If {
            loc,
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    /// forexpr := 'for' ident '=' expr ',' expr (',' expr)? 'in' expression
    fn parse_for(&mut self, ops: &OperatorTable) -> Result<Expr, CompileError> {
        let loc = self.current().loc;
        self.advance(); // eat 'for'

        let var = match &self.current().kind {
            TokenKind::Ident(id) => id.clone(),
            _ => return Err(self.error("Expected identifier after 'for'")),
        };
        self.advance();

        if self.current().kind != TokenKind::Char('=') {
            return Err(self.error("Expected '=' after loop variable"));
        }
        self.advance();

        let start = self.parse_expression(ops)?;
        if self.current().kind != TokenKind::Char(',') {
            return Err(self.error("Expected ',' after start value"));
        }
        self.advance();

        let end = self.parse_expression(ops)?;

        let step = if self.current().kind == TokenKind::Char(',') {
            self.advance();
            Some(Box::new(self.parse_expression(ops)?))
        } else {
            None
        };

        if self.current().kind != TokenKind::In {
            return Err(self.error("Expected 'in' after 'for'"));
        }
        self.advance();

        let body = self.parse_expression(ops)?;
        Ok(Expr::For {
            loc,
            var,
            start: Box::new(start),
            end: Box::new(end),
            step,
            body: Box::new(body),
        })
    }

    /// varexpr := 'var' ident ('=' expr)? (',' ident ('=' expr)?)* 'in' expression
    fn parse_var(&mut self, ops: &OperatorTable) -> Result<Expr, CompileError> {
        let loc = self.current().loc;
        self.advance(); // eat 'var'

        if !matches!(self.current().kind, TokenKind::Ident(_)) {
            return Err(self.error("Expected identifier after 'var'"));
        }

        let mut bindings = Vec::new();
        loop {
            let name = match &self.current().kind {
                TokenKind::Ident(id) => id.clone(),
                _ => return Err(self.error("Expected identifier list after 'var'")),
            };
            self.advance();

            let init = if self.current().kind == TokenKind::Char('=') {
                self.advance();
                Some(self.parse_expression(ops)?)
            } else {
                None
            };
            bindings.push((name, init));

            if self.current().kind != TokenKind::Char(',') {
                break;
            }
            self.advance();
        }

        if self.current().kind != TokenKind::In {
            return Err(self.error("Expected 'in' keyword after 'var'"));
        }
        self.advance();

        let body = self.parse_expression(ops)?;
        Ok(Expr::VarIn {
            loc,
            bindings,
            body: Box::new(body),
        })
    }
}
