//! Human-readable disassembly listing for diagnostics and the `aislc`
//! `--disassemble` flag. Not an artifact format: addresses are annotated and
//! function boundaries are labelled, but the output is not meant to be
//! parsed back (see [`crate::text`] for the round-trippable format).

use crate::instruction::Operand;
use crate::module::Module;

/// Render a module as an address-annotated instruction listing.
pub fn disassemble(module: &Module) -> String {
    let mut out = String::new();

    if !module.strings.is_empty() {
        out.push_str("; strings\n");
        for (i, s) in module.strings.iter().enumerate() {
            out.push_str(&format!(";   [{i}] {s:?}\n"));
        }
    }

    let mut labels: Vec<(u32, &str)> =
        module.functions.iter().map(|f| (f.start_addr, f.name.as_str())).collect();
    labels.sort_by_key(|(addr, _)| *addr);

    for (addr, instr) in module.instructions.iter().enumerate() {
        if let Some((_, name)) = labels.iter().find(|(a, _)| *a as usize == addr) {
            out.push_str(&format!("{name}:\n"));
        }
        out.push_str(&format!("{addr:>6}: {}", instr.opcode.mnemonic()));
        match instr.operand {
            Operand::None => {}
            Operand::I64(v) => out.push_str(&format!(" {v}")),
            Operand::F64(v) => out.push_str(&format!(" {v}")),
            Operand::U32(v) => out.push_str(&format!(" {v}")),
            Operand::Bool(v) => out.push_str(&format!(" {v}")),
            Operand::Jump(t) => out.push_str(&format!(" -> {t}")),
            Operand::Call { func_idx, arg_count } => {
                let callee = module
                    .functions
                    .get(func_idx as usize)
                    .map(|f| f.name.as_str())
                    .unwrap_or("?");
                out.push_str(&format!(" {callee}/{arg_count}"));
            }
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Instruction;
    use crate::module::FunctionEntry;
    use crate::opcode::Opcode;

    #[test]
    fn disassembly_labels_function_entry_points() {
        let mut m = Module::new();
        m.instructions.push(Instruction::nullary(Opcode::Return));
        m.instructions.push(Instruction::nullary(Opcode::Halt));
        m.functions.push(FunctionEntry {
            name: "main".into(),
            start_addr: 0,
            local_count: 0,
            param_count: 0,
        });
        let text = disassemble(&m);
        assert!(text.contains("main:"));
        assert!(text.contains("RETURN"));
        assert!(text.contains("HALT"));
    }

    #[test]
    fn call_operand_resolves_callee_name() {
        let mut m = Module::new();
        m.instructions.push(Instruction::new(
            Opcode::Call,
            Operand::Call { func_idx: 0, arg_count: 2 },
        ));
        m.instructions.push(Instruction::nullary(Opcode::Halt));
        m.functions.push(FunctionEntry {
            name: "add".into(),
            start_addr: 0,
            local_count: 0,
            param_count: 2,
        });
        let text = disassemble(&m);
        assert!(text.contains("add/2"));
    }
}
