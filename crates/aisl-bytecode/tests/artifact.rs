use aisl_bytecode::{
    disassemble, parse_text, verify, write_text, FunctionEntry, Instruction, Module, ModuleError,
    Opcode, Operand, VerifyError,
};
use aisl_vm::Vm;

fn recursive_factorial_module() -> Module {
    // factorial(n): if n <= 1 then 1 else n * factorial(n - 1)
    let mut m = Module::new();
    use Opcode::*;

    m.instructions.push(Instruction::new(LoadLocal, Operand::U32(0))); // 0
    m.instructions.push(Instruction::new(PushInt, Operand::I64(1))); // 1
    m.instructions.push(Instruction::nullary(LeI64)); // 2
    m.instructions.push(Instruction::new(JumpIfFalse, Operand::Jump(6))); // 3
    m.instructions.push(Instruction::new(PushInt, Operand::I64(1))); // 4
    m.instructions.push(Instruction::nullary(Return)); // 5
    m.instructions.push(Instruction::new(LoadLocal, Operand::U32(0))); // 6
    m.instructions.push(Instruction::new(LoadLocal, Operand::U32(0))); // 7
    m.instructions.push(Instruction::new(PushInt, Operand::I64(1))); // 8
    m.instructions.push(Instruction::nullary(SubI64)); // 9
    m.instructions.push(Instruction::new(
        Call,
        Operand::Call { func_idx: 0, arg_count: 1 },
    )); // 10
    m.instructions.push(Instruction::nullary(MulI64)); // 11
    m.instructions.push(Instruction::nullary(Return)); // 12
    m.instructions.push(Instruction::nullary(Halt)); // 13

    m.functions.push(FunctionEntry {
        name: "factorial".into(),
        start_addr: 0,
        local_count: 1,
        param_count: 1,
    });
    m
}

/// `recursive_factorial_module` with a `main` appended that calls
/// `factorial(10)` and returns its result as the exit code, so the artifact
/// can actually be run rather than just inspected.
fn runnable_factorial_module() -> Module {
    let mut m = recursive_factorial_module();
    use Opcode::*;

    // The base module already ends on a trailing Halt; splice main's body in
    // ahead of it and move Halt to the new end.
    m.instructions.pop();
    let main_start = m.instructions.len() as u32;
    m.instructions.push(Instruction::new(PushInt, Operand::I64(10)));
    m.instructions.push(Instruction::new(Call, Operand::Call { func_idx: 0, arg_count: 1 }));
    m.instructions.push(Instruction::nullary(Return));
    m.instructions.push(Instruction::nullary(Halt));

    m.functions.push(FunctionEntry {
        name: "main".into(),
        start_addr: main_start,
        local_count: 0,
        param_count: 0,
    });
    m
}

#[test]
fn binary_and_text_artifacts_agree_when_executed() {
    let m = runnable_factorial_module();
    verify(&m).unwrap();

    let from_binary = Module::decode(&m.encode()).unwrap();
    let from_text = parse_text(&write_text(&m)).unwrap();

    let binary_exit = Vm::new(from_binary).run().expect("binary artifact runs");
    let text_exit = Vm::new(from_text).run().expect("text artifact runs");
    let in_memory_exit = Vm::new(m).run().expect("in-memory artifact runs");

    assert_eq!(binary_exit, 3628800);
    assert_eq!(binary_exit, text_exit);
    assert_eq!(binary_exit, in_memory_exit);
}

#[test]
fn recursive_factorial_module_is_well_formed() {
    let m = recursive_factorial_module();
    verify(&m).expect("recursive factorial module should satisfy all structural invariants");
}

#[test]
fn binary_and_text_artifacts_agree_after_roundtrip() {
    let m = recursive_factorial_module();

    let binary = m.encode();
    let from_binary = Module::decode(&binary).unwrap();

    let text = write_text(&m);
    let from_text = parse_text(&text).unwrap();

    assert_eq!(from_binary.instructions, from_text.instructions);
    assert_eq!(from_binary.functions, from_text.functions);
    assert_eq!(from_binary.strings.len(), from_text.strings.len());

    verify(&from_binary).unwrap();
    verify(&from_text).unwrap();
}

#[test]
fn corrupted_binary_header_is_rejected_without_partial_state() {
    let m = recursive_factorial_module();
    let mut bytes = m.encode();
    bytes.truncate(2);
    assert!(matches!(Module::decode(&bytes), Err(ModuleError::Decode(_))));
}

#[test]
fn disassembly_of_a_verified_module_names_every_function() {
    let m = recursive_factorial_module();
    verify(&m).unwrap();
    let listing = disassemble(&m);
    assert!(listing.contains("factorial:"));
    assert!(listing.contains("CALL"));
}

#[test]
fn a_module_missing_its_trailing_halt_fails_verification() {
    let mut m = recursive_factorial_module();
    m.instructions.pop();
    assert_eq!(verify(&m), Err(VerifyError::MissingTrailingHalt));
}
