//! AST to IR lowering.
//!
//! This module turns the parsed AST into SSA IR through the [`Builder`]
//! contract, maintaining the semantic tables along the way: the prototype
//! table for forward references and redeclaration, the symbol table for
//! mutable bindings, and the operator-precedence table that user operator
//! definitions extend.

pub mod context;
pub mod expr;
pub mod func;

pub use context::Lowerer;
