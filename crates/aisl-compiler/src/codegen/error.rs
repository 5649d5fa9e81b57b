use crate::desugar::DesugarError;
use crate::module_loader::ResolveError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("function {name} expects {expected} argument(s), got {actual}")]
    ArityMismatch { name: String, expected: usize, actual: usize },

    #[error("unresolved label: {0}")]
    UnresolvedLabel(String),

    #[error("circular import: {0}")]
    CircularImport(String),

    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch { context: String, expected: String, found: String },

    #[error("break used outside of any loop")]
    BreakOutsideLoop,

    #[error("continue used outside of any loop")]
    ContinueOutsideLoop,

    #[error("duplicate label: {0}")]
    DuplicateLabel(String),

    #[error("module has no main function or test specs")]
    MissingMain,

    #[error(transparent)]
    Desugar(#[from] DesugarError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
