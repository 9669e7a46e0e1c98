use crate::SourceLocation;

/// An expression. Every variant evaluates to exactly one double.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(SourceLocation, f64),
    Variable(SourceLocation, String),
    Unary {
        loc: SourceLocation,
        op: char,
        operand: Box<Expr>,
    },
    Binary {
        loc: SourceLocation,
        op: char,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Function call: callee(args)
    Call {
        loc: SourceLocation,
        callee: String,
        args: Vec<Expr>,
    },
    /// Conditional expression; both arms are mandatory.
    If {
        loc: SourceLocation,
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    /// `for i = start, end, step in body` — step is optional and defaults to 1.
    For {
        loc: SourceLocation,
        var: String,
        start: Box<Expr>,
        end: Box<Expr>,
        step: Option<Box<Expr>>,
        body: Box<Expr>,
    },
    /// `var a = init, b in body` — initializers are optional and default to 0.
    VarIn {
        loc: SourceLocation,
        bindings: Vec<(String, Option<Expr>)>,
        body: Box<Expr>,
    },
}

impl Expr {
    pub fn location(&self) -> SourceLocation {
        match self {
            Expr::Number(loc, _) => *loc,
            Expr::Variable(loc, _) => *loc,
            Expr::Unary { loc, .. } => *loc,
            Expr::Binary { loc, .. } => *loc,
            Expr::Call { loc, .. } => *loc,
            Expr::If { loc, .. } => *loc,
            Expr::For { loc, .. } => *loc,
            Expr::VarIn { loc, .. } => *loc,
        }
    }
}

/// What a prototype declares: a plain function or an operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrototypeKind {
    Function,
    UnaryOp(char),
    BinaryOp { op: char, precedence: u32 },
}

/// A function's declaration: its symbol name and parameter names.
///
/// Operator prototypes use the mangled symbol names `unary<op>` and
/// `binary<op>`; the operator character and (for binary) its precedence
/// travel in [`PrototypeKind`].
#[derive(Debug, Clone, PartialEq)]
pub struct Prototype {
    pub loc: SourceLocation,
    pub name: String,
    pub params: Vec<String>,
    pub kind: PrototypeKind,
}

/// A function definition: prototype plus a single body expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub proto: Prototype,
    pub body: Expr,
}

/// One top-level form.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// `def` prototype expression
    Definition(FunctionDef),
    /// `extern` prototype
    Extern(Prototype),
    /// A bare expression, already wrapped in an anonymous zero-argument
    /// function so it can be called from the synthesized entry point.
    TopLevel(FunctionDef),
    /// A stray `;`
    Empty,
    Eof,
}
