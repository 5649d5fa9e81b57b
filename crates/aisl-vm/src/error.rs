use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VmError {
    #[error("operand stack overflow")]
    StackOverflow,

    #[error("operand stack underflow")]
    StackUnderflow,

    #[error("call stack overflow")]
    CallStackOverflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid opcode byte 0x{0:02X}")]
    InvalidOpcode(u8),

    #[error("unresolved function")]
    UnresolvedFunction,

    #[error("unwrap called on an error result: [{code}] {message}")]
    UnwrapOnErr { code: i64, message: String },

    #[error("host call failed: {0}")]
    HostCallFailed(String),
}
