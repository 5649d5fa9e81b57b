//! AST contract for the AISL language.
//!
//! This crate defines the typed abstract syntax tree the (out-of-scope)
//! lexer and parser produce. It has no dependency on the rest of the
//! workspace: it is the seam a parser is expected to write into, and the
//! seam the compiler crate reads from.

pub mod expr;
pub mod module;
pub mod ty;

pub use expr::{BinOp, Binding, Expr, ExprKind, IoOp, Literal};
pub use module::{Definition, Function, Import, Module, Param, TestCase, TestSpec};
pub use ty::Type;
