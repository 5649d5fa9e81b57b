//! The compiled artifact: instructions, string pool, and function table.

use crate::constants::ConstantPool;
use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use crate::instruction::{Instruction, Operand};
use crate::opcode::Opcode;
use thiserror::Error;

/// Magic number for the binary artifact format: the ASCII bytes "AISL"
/// read as a little-endian `u32`.
pub const MAGIC: u32 = 0x4149_534C;

/// Magic token for the parallel text format.
pub const TEXT_MAGIC: &str = "AISLTEXT1";

/// Errors that can occur while loading a compiled artifact.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid magic number: expected 0x{MAGIC:08X}, got 0x{0:08X}")]
    InvalidMagic(u32),

    #[error("instruction count mismatch: header declared {declared}, decoded {decoded}")]
    InstructionCountMismatch { declared: usize, decoded: usize },

    #[error("unrecognised mnemonic {0:?} in text artifact")]
    UnknownMnemonic(String),

    #[error("malformed text artifact: {0}")]
    MalformedText(String),
}

/// One entry in the function table: name, entry point, and frame shape.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionEntry {
    pub name: String,
    pub start_addr: u32,
    pub local_count: u32,
    pub param_count: u32,
}

/// A compiled, immutable AISL program.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub instructions: Vec<Instruction>,
    pub strings: ConstantPool,
    pub functions: Vec<FunctionEntry>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_function(&self, name: &str) -> Option<(usize, &FunctionEntry)> {
        self.functions.iter().enumerate().find(|(_, f)| f.name == name)
    }

    // ===== Binary format =====

    /// Encode to the bit-exact binary artifact format described in the
    /// instruction set contract: little-endian, packed, no padding.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = BytecodeWriter::with_capacity(64 + self.instructions.len() * 9);
        w.emit_u32(MAGIC);
        w.emit_u32(self.instructions.len() as u32);
        for instr in &self.instructions {
            encode_instruction(&mut w, instr);
        }
        self.strings.encode(&mut w);
        w.emit_u32(self.functions.len() as u32);
        for f in &self.functions {
            w.emit_string(&f.name);
            w.emit_u32(f.start_addr);
            w.emit_u32(f.local_count);
        }
        w.into_bytes()
    }

    /// Decode from the binary artifact format. Never partially applies a
    /// failed load: on error, no `Module` is constructed.
    pub fn decode(bytes: &[u8]) -> Result<Self, ModuleError> {
        let mut r = BytecodeReader::new(bytes);
        let magic = r.read_u32()?;
        if magic != MAGIC {
            return Err(ModuleError::InvalidMagic(magic));
        }
        let declared_count = r.read_u32()? as usize;
        let mut instructions = Vec::with_capacity(declared_count);
        for _ in 0..declared_count {
            instructions.push(decode_instruction(&mut r)?);
        }
        if instructions.len() != declared_count {
            return Err(ModuleError::InstructionCountMismatch {
                declared: declared_count,
                decoded: instructions.len(),
            });
        }
        let strings = ConstantPool::decode(&mut r)?;
        let function_count = r.read_u32()? as usize;
        let mut functions = Vec::with_capacity(function_count);
        for _ in 0..function_count {
            let name = r.read_string()?;
            let start_addr = r.read_u32()?;
            let local_count = r.read_u32()?;
            // param_count is not persisted in the binary layout (the spec's
            // function-table wire format carries name/start/locals only);
            // it is recovered from the module's own declaration pass at
            // link time and defaults to 0 for a freshly-decoded artifact
            // consumed directly by the VM, which only needs start/locals.
            functions.push(FunctionEntry { name, start_addr, local_count, param_count: 0 });
        }
        Ok(Module { instructions, strings, functions })
    }
}

fn encode_instruction(w: &mut BytecodeWriter, instr: &Instruction) {
    w.emit_u8(instr.opcode.to_u8());
    match instr.operand {
        Operand::None => {}
        Operand::I64(v) => w.emit_i64(v),
        Operand::F64(v) => w.emit_f64(v),
        Operand::U32(v) => w.emit_u32(v),
        Operand::Bool(v) => w.emit_bool(v),
        Operand::Jump(target) => w.emit_u32(target),
        Operand::Call { func_idx, arg_count } => {
            w.emit_u32(func_idx);
            w.emit_u32(arg_count);
        }
    }
}

fn decode_instruction(r: &mut BytecodeReader<'_>) -> Result<Instruction, DecodeError> {
    let offset = r.offset();
    let byte = r.read_u8()?;
    let opcode = Opcode::from_u8(byte).ok_or(DecodeError::InvalidOpcode(byte, offset))?;
    let operand = match opcode {
        Opcode::PushInt => Operand::I64(r.read_i64()?),
        Opcode::PushFloat => Operand::F64(r.read_f64()?),
        Opcode::PushBool => Operand::Bool(r.read_bool()?),
        Opcode::PushString | Opcode::LoadLocal | Opcode::StoreLocal | Opcode::ArrayNew
        | Opcode::ChannelNew => Operand::U32(r.read_u32()?),
        Opcode::Jump | Opcode::JumpIfFalse | Opcode::JumpIfTrue => Operand::Jump(r.read_u32()?),
        Opcode::Call | Opcode::HostCall => {
            Operand::Call { func_idx: r.read_u32()?, arg_count: r.read_u32()? }
        }
        _ => Operand::None,
    };
    Ok(Instruction::new(opcode, operand))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Instruction;

    fn sample_module() -> Module {
        let mut m = Module::new();
        let idx = m.strings.intern("hello");
        m.instructions.push(Instruction::new(Opcode::PushString, Operand::U32(idx)));
        m.instructions.push(Instruction::new(Opcode::PushInt, Operand::I64(42)));
        m.instructions.push(Instruction::new(
            Opcode::Call,
            Operand::Call { func_idx: 0, arg_count: 1 },
        ));
        m.instructions.push(Instruction::nullary(Opcode::Return));
        m.instructions.push(Instruction::nullary(Opcode::Halt));
        m.functions.push(FunctionEntry {
            name: "main".into(),
            start_addr: 0,
            local_count: 1,
            param_count: 0,
        });
        m
    }

    #[test]
    fn binary_roundtrip_is_byte_identical() {
        let m = sample_module();
        let bytes1 = m.encode();
        let decoded = Module::decode(&bytes1).unwrap();
        let bytes2 = decoded.encode();
        assert_eq!(bytes1, bytes2);
    }

    #[test]
    fn decoded_counts_match_in_memory_counts() {
        let m = sample_module();
        let bytes = m.encode();
        let decoded = Module::decode(&bytes).unwrap();
        assert_eq!(decoded.instructions.len(), m.instructions.len());
        assert_eq!(decoded.strings.len(), m.strings.len());
        assert_eq!(decoded.functions.len(), m.functions.len());
    }

    #[test]
    fn bad_magic_fails_the_load() {
        let mut bytes = sample_module().encode();
        bytes[0] = 0x00;
        assert!(matches!(Module::decode(&bytes), Err(ModuleError::InvalidMagic(_))));
    }

    #[test]
    fn truncated_artifact_fails_the_load() {
        let bytes = sample_module().encode();
        let truncated = &bytes[..bytes.len() - 3];
        assert!(Module::decode(truncated).is_err());
    }
}
