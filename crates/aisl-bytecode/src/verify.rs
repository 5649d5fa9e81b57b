//! Structural verification of a loaded [`Module`], independent of the
//! binary/text encoding concerns. Run once after decode and before a module
//! is handed to the compiler's linker or the VM.

use crate::module::Module;
use crate::opcode::Opcode;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("jump at instruction {at} targets {target}, which is out of bounds (program has {len} instructions)")]
    JumpOutOfBounds { at: usize, target: u32, len: usize },

    #[error("function {name:?} starting at {start_addr} does not end in a RETURN before the next function or end of program")]
    MissingReturn { name: String, start_addr: u32 },

    #[error("program does not end with a HALT instruction")]
    MissingTrailingHalt,

    #[error("function {name:?} has start address {start_addr}, which is out of bounds")]
    FunctionStartOutOfBounds { name: String, start_addr: u32 },

    #[error("duplicate function name {0:?}")]
    DuplicateFunction(String),
}

/// Verify structural invariants the compiler and the binary format both
/// promise: every jump targets a real instruction, every function body ends
/// in a `RETURN`, and the program itself ends with a trailing `HALT`.
pub fn verify(module: &Module) -> Result<(), VerifyError> {
    let len = module.instructions.len();

    for (at, instr) in module.instructions.iter().enumerate() {
        if let Some(target) = instr.jump_target() {
            if target as usize >= len {
                return Err(VerifyError::JumpOutOfBounds { at, target, len });
            }
        }
    }

    let mut seen_names = std::collections::HashSet::new();
    for f in &module.functions {
        if !seen_names.insert(f.name.as_str()) {
            return Err(VerifyError::DuplicateFunction(f.name.clone()));
        }
        if f.start_addr as usize >= len {
            return Err(VerifyError::FunctionStartOutOfBounds {
                name: f.name.clone(),
                start_addr: f.start_addr,
            });
        }
    }

    let mut starts: Vec<u32> = module.functions.iter().map(|f| f.start_addr).collect();
    starts.sort_unstable();
    for f in &module.functions {
        let body_end = starts
            .iter()
            .filter(|&&s| s > f.start_addr)
            .min()
            .map(|&s| s as usize)
            .unwrap_or(len);
        let ends_in_return = module.instructions[f.start_addr as usize..body_end]
            .iter()
            .any(|i| i.opcode == Opcode::Return);
        if !ends_in_return {
            return Err(VerifyError::MissingReturn {
                name: f.name.clone(),
                start_addr: f.start_addr,
            });
        }
    }

    if len == 0 || module.instructions[len - 1].opcode != Opcode::Halt {
        return Err(VerifyError::MissingTrailingHalt);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{Instruction, Operand};
    use crate::module::FunctionEntry;

    fn entry(name: &str, start_addr: u32) -> FunctionEntry {
        FunctionEntry { name: name.into(), start_addr, local_count: 0, param_count: 0 }
    }

    #[test]
    fn well_formed_module_verifies() {
        let mut m = Module::new();
        m.instructions.push(Instruction::new(Opcode::PushInt, Operand::I64(1)));
        m.instructions.push(Instruction::nullary(Opcode::Return));
        m.instructions.push(Instruction::nullary(Opcode::Halt));
        m.functions.push(entry("main", 0));
        assert!(verify(&m).is_ok());
    }

    #[test]
    fn out_of_bounds_jump_is_rejected() {
        let mut m = Module::new();
        m.instructions.push(Instruction::new(Opcode::Jump, Operand::Jump(99)));
        m.instructions.push(Instruction::nullary(Opcode::Halt));
        assert!(matches!(verify(&m), Err(VerifyError::JumpOutOfBounds { .. })));
    }

    #[test]
    fn missing_trailing_halt_is_rejected() {
        let mut m = Module::new();
        m.instructions.push(Instruction::nullary(Opcode::Return));
        assert_eq!(verify(&m), Err(VerifyError::MissingTrailingHalt));
    }

    #[test]
    fn function_body_without_return_is_rejected() {
        let mut m = Module::new();
        m.instructions.push(Instruction::new(Opcode::PushInt, Operand::I64(1)));
        m.instructions.push(Instruction::nullary(Opcode::Pop));
        m.instructions.push(Instruction::nullary(Opcode::Halt));
        m.functions.push(entry("broken", 0));
        assert!(matches!(verify(&m), Err(VerifyError::MissingReturn { .. })));
    }

    #[test]
    fn duplicate_function_names_are_rejected() {
        let mut m = Module::new();
        m.instructions.push(Instruction::nullary(Opcode::Return));
        m.instructions.push(Instruction::nullary(Opcode::Halt));
        m.functions.push(entry("dup", 0));
        m.functions.push(entry("dup", 0));
        assert!(matches!(verify(&m), Err(VerifyError::DuplicateFunction(_))));
    }
}
