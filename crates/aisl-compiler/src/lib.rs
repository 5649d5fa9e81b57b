//! Desugaring, module resolution, and the two-pass bytecode compiler.

pub mod codegen;
pub mod desugar;
pub mod module_loader;

pub use codegen::{compile_program, CompileError};
pub use desugar::{DesugarError, Desugarer};
pub use module_loader::{ModuleCache, ModuleResolver, ResolveError};
