//! Core compiler pipeline for the Kaleidoscope language.
//!
//! The pipeline is roughly:
//!
//!   source text
//!     -> frontend::lexer   (tokens with source locations)
//!     -> frontend::parser  (AST, precedence-climbed expressions)
//!     -> ir::ir_generator  (SSA IR, one value per expression)
//!     -> driver            (per-form session loop, `main` synthesis)
//!
//! The driver hands the finished in-memory [`ir::Module`] to whatever produces
//! a target object; object emission and linking live outside this crate.

pub mod ast;
pub mod driver;
pub mod frontend;
pub mod ir;
pub mod preprocess;

use std::fmt;

use thiserror::Error;

/// A line/column position in the source text.
///
/// Lines start at 1. Columns count bytes since the last line break, so the
/// first character on a line sits in column 1; a location at column 0 points
/// at the break itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Classification of errors raised while lowering the AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    /// A variable or function name with no visible definition.
    UnknownName,
    /// A user operator that has not been declared with `def unary`/`def binary`.
    UnknownOperator,
    /// The left-hand side of `=` was not a plain variable.
    InvalidAssignTarget,
    /// A call whose argument count differs from the callee's parameter count.
    ArgCountMismatch,
    /// A `def` for a function that already has a body.
    Redefinition,
    /// The same parameter name appearing twice in one prototype.
    ParameterRedefinition,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Parse error at {location}: {message}")]
    Parse {
        location: SourceLocation,
        message: String,
    },

    #[error("Semantic error at {location}: {message}")]
    Semantic {
        kind: SemanticErrorKind,
        location: SourceLocation,
        message: String,
    },

    #[error("Verification of '{function}' failed: {message}")]
    Verify { function: String, message: String },
}

pub use driver::{compile, CompileOutput};

/// Compile a whole source text, failing on the first diagnostic.
///
/// The session-level API ([`compile`]) recovers per top-level form and keeps
/// going; this wrapper is for callers that want all-or-nothing behaviour.
pub fn compile_to_module(source: &str) -> Result<ir::Module, CompileError> {
    let output = driver::compile(source);
    match output.diagnostics.into_iter().next() {
        Some(error) => Err(error),
        None => Ok(output.module),
    }
}
