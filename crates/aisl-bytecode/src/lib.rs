//! Bytecode instruction set and artifact format for the AISL virtual
//! machine: opcodes, instruction operands, the constant pool, the binary and
//! text artifact encodings, structural verification, and disassembly.

pub mod constants;
pub mod disasm;
pub mod encoder;
pub mod instruction;
pub mod module;
pub mod opcode;
pub mod text;
pub mod verify;

pub use constants::ConstantPool;
pub use disasm::disassemble;
pub use encoder::{BytecodeReader, BytecodeWriter, DecodeError};
pub use instruction::{Instruction, Operand, PENDING_JUMP_SENTINEL};
pub use module::{FunctionEntry, Module, ModuleError, MAGIC, TEXT_MAGIC};
pub use opcode::{Opcode, ALL_OPCODES};
pub use text::{parse_text, write_text};
pub use verify::{verify, VerifyError};
