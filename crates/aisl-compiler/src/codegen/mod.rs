//! Two-pass compiler: declares every function across the linked module
//! graph, then emits each body into one shared instruction stream.

pub mod dispatch;
pub mod error;
pub mod locals;

use crate::desugar::{self, Desugarer};
use crate::module_loader::{ModuleCache, ResolveError};
pub use error::CompileError;
use locals::LocalsTable;

use aisl_ast::{BinOp, Binding, Expr, ExprKind, IoOp, Literal, Module as AstModule, Type};
use aisl_bytecode::{FunctionEntry, Instruction, Module as BcModule, Opcode, Operand};
use rustc_hash::FxHashMap;
use std::path::PathBuf;

/// Builtins with a single fixed opcode and fixed stack arity. `array_new`,
/// `channel_new`, and `host_call` are special-cased outside this table: the
/// first two carry a compile-time operand rather than a purely stack-based
/// arity, and `host_call` is variadic.
const FIXED_BUILTINS: &[(&str, Opcode, usize)] = &[
    ("io_open", Opcode::IoOpen, 2),
    ("io_read", Opcode::IoRead, 2),
    ("io_write", Opcode::IoWrite, 2),
    ("io_close", Opcode::IoClose, 1),
    ("io_stdin_read", Opcode::IoStdinRead, 0),
    ("gc_collect", Opcode::GcCollect, 0),
    ("gc_stats", Opcode::GcStats, 0),
    ("json_parse", Opcode::JsonParse, 1),
    ("json_stringify", Opcode::JsonStringify, 1),
    ("channel_send", Opcode::ChannelSend, 2),
    ("channel_recv", Opcode::ChannelRecv, 1),
    ("is_ok", Opcode::IsOk, 1),
    ("is_err", Opcode::IsErr, 1),
    ("unwrap", Opcode::Unwrap, 1),
    ("unwrap_or", Opcode::UnwrapOr, 2),
    ("error_code", Opcode::ErrorCode, 1),
    ("error_msg", Opcode::ErrorMsg, 1),
    ("map_new", Opcode::MapNew, 0),
    ("map_has", Opcode::MapHas, 2),
    ("map_delete", Opcode::MapDelete, 2),
    ("map_keys", Opcode::MapKeys, 1),
    ("str_split", Opcode::StrSplit, 2),
    ("str_trim", Opcode::StrTrim, 1),
    ("str_from_decimal", Opcode::StrFromDecimal, 1),
];

/// A function pending emission: which module it came from and its AST.
struct FunctionPlan {
    body: Expr,
    params: Vec<(String, Type)>,
}

/// Compile `entry_name` and everything it transitively imports from
/// `modules`, in import-topological order, into one linked artifact.
pub fn compile_program(
    entry_name: &str,
    modules: &FxHashMap<String, AstModule>,
) -> Result<BcModule, CompileError> {
    let mut cache = ModuleCache::new();
    let mut order = Vec::new();
    link_order(entry_name, modules, &mut cache, &mut order)?;

    let mut bc = BcModule::new();
    let mut functions_by_name: FxHashMap<String, u32> = FxHashMap::default();
    let mut plans: Vec<FunctionPlan> = Vec::new();

    // Pass 1: declare every function across the linked graph.
    for module_name in &order {
        let module = &modules[module_name];
        for func in module.functions() {
            if functions_by_name.contains_key(&func.name) {
                continue;
            }
            let idx = bc.functions.len() as u32;
            functions_by_name.insert(func.name.clone(), idx);
            bc.functions.push(FunctionEntry {
                name: func.name.clone(),
                start_addr: 0,
                local_count: 0,
                param_count: func.params.len() as u32,
            });
            plans.push(FunctionPlan {
                body: func.body.clone(),
                params: func.params.iter().map(|p| (p.name.clone(), p.ty.clone())).collect(),
            });
        }
    }

    let entry_module = &modules[entry_name];
    let synth_main = synthesize_test_main(entry_module, &functions_by_name)?;
    if let Some(ref synth) = synth_main {
        if !functions_by_name.contains_key("main") {
            let idx = bc.functions.len() as u32;
            functions_by_name.insert("main".to_string(), idx);
            bc.functions.push(FunctionEntry {
                name: "main".to_string(),
                start_addr: 0,
                local_count: 0,
                param_count: 0,
            });
            plans.push(FunctionPlan { body: synth.clone(), params: Vec::new() });
        }
    }

    if !functions_by_name.contains_key("main") {
        return Err(CompileError::MissingMain);
    }

    // Pass 2: emit each function body, in declaration order.
    for (i, plan) in plans.iter().enumerate() {
        let start_addr = bc.instructions.len() as u32;
        let mut locals = LocalsTable::new();
        for (name, ty) in &plan.params {
            locals.declare(name, ty.clone());
        }
        let desugared = Desugarer::new().desugar(plan.body.clone())?;
        let mut emitter =
            Emitter { bc: &mut bc, functions_by_name: &functions_by_name, locals, labels: FxHashMap::default(), pending_jumps: Vec::new() };
        emitter.lower(&desugared)?;
        emitter.resolve_pending_jumps()?;
        emitter.emit(Opcode::Return, Operand::None);
        bc.functions[i].start_addr = start_addr;
        bc.functions[i].local_count = emitter.locals.slot_count();
    }

    bc.instructions.push(Instruction::nullary(Opcode::Halt));
    Ok(bc)
}

/// Depth-first import order: each module appears after everything it
/// imports. Uses `ModuleCache`'s `is_compiling` flag to detect cycles.
fn link_order(
    name: &str,
    modules: &FxHashMap<String, AstModule>,
    cache: &mut ModuleCache,
    order: &mut Vec<String>,
) -> Result<(), CompileError> {
    if cache.is_cached(name) {
        return Ok(());
    }
    let module = modules.get(name).ok_or_else(|| {
        CompileError::from(ResolveError::ModuleNotFound { name: name.to_string(), tried: Vec::new() })
    })?;
    cache.begin_load(name, PathBuf::from(format!("{name}.aisl")), String::new())?;
    for import in &module.imports {
        link_order(&import.module_name, modules, cache, order)?;
    }
    cache.finish_load(name, module.clone());
    order.push(name.to_string());
    Ok(())
}

/// If `module` declares test-specs and has no `main`, build the synthetic
/// `main` body that exercises every case.
fn synthesize_test_main(
    module: &AstModule,
    functions_by_name: &FxHashMap<String, u32>,
) -> Result<Option<Expr>, CompileError> {
    if module.has_main() {
        return Ok(None);
    }
    let specs: Vec<_> = module.test_specs().collect();
    if specs.is_empty() {
        return Ok(None);
    }

    let mut body = Vec::new();
    for spec in &specs {
        if !functions_by_name.contains_key(&spec.target) {
            return Err(CompileError::UnknownFunction(spec.target.clone()));
        }
        for case in &spec.cases {
            body.push(Expr::new(ExprKind::Apply {
                callee: "print".to_string(),
                args: vec![Expr::typed(
                    ExprKind::Literal(Literal::String(case.description.clone())),
                    Type::String,
                )],
            }));
            let call_args: Vec<Expr> =
                case.args.iter().map(|lit| Expr::new(ExprKind::Literal(lit.clone()))).collect();
            let expected_ty = literal_type(&case.expected);
            body.push(Expr::new(ExprKind::Apply {
                callee: "assert_test_case".to_string(),
                args: {
                    let mut a = vec![Expr::new(ExprKind::Apply {
                        callee: spec.target.clone(),
                        args: call_args,
                    })];
                    a.push(Expr::typed(ExprKind::Literal(case.expected.clone()), expected_ty));
                    a
                },
            }));
        }
    }
    body.push(Expr::new(ExprKind::Literal(Literal::Int(0))));
    Ok(Some(Expr::new(ExprKind::Seq(body))))
}

fn literal_type(lit: &Literal) -> Type {
    match lit {
        Literal::Int(_) => Type::Int,
        Literal::Float(_) => Type::Float,
        Literal::String(_) => Type::String,
        Literal::Bool(_) => Type::Bool,
        Literal::Unit => Type::Unit,
    }
}

/// Infers the dispatch type of `expr` per the tie-breaking rules: an
/// explicit AST annotation wins; otherwise the locals table (for a known
/// variable) or the literal's own kind; otherwise `int`.
fn infer_type(expr: &Expr, locals: &LocalsTable) -> Type {
    if let Some(ty) = &expr.ty {
        return ty.clone();
    }
    match &expr.kind {
        ExprKind::Literal(Literal::Int(_)) => Type::Int,
        ExprKind::Literal(Literal::Float(_)) => Type::Float,
        ExprKind::Literal(Literal::String(_)) => Type::String,
        ExprKind::Literal(Literal::Bool(_)) => Type::Bool,
        ExprKind::Literal(Literal::Unit) => Type::Unit,
        ExprKind::Var(name) => {
            locals.resolve(name).map(|(_, ty)| ty.clone()).unwrap_or(Type::Int)
        }
        _ => Type::Int,
    }
}

struct Emitter<'a> {
    bc: &'a mut BcModule,
    functions_by_name: &'a FxHashMap<String, u32>,
    locals: LocalsTable,
    labels: FxHashMap<String, u32>,
    pending_jumps: Vec<(usize, String)>,
}

impl<'a> Emitter<'a> {
    fn current_addr(&self) -> u32 {
        self.bc.instructions.len() as u32
    }

    fn emit(&mut self, opcode: Opcode, operand: Operand) -> usize {
        self.bc.instructions.push(Instruction::new(opcode, operand));
        self.bc.instructions.len() - 1
    }

    fn patch_jump(&mut self, idx: usize, target: u32) {
        self.bc.instructions[idx].patch_jump_target(target);
    }

    fn intern(&mut self, s: &str) -> u32 {
        self.bc.strings.intern(s)
    }

    fn resolve_pending_jumps(&mut self) -> Result<(), CompileError> {
        let pending = std::mem::take(&mut self.pending_jumps);
        for (idx, label) in pending {
            let target = self
                .labels
                .get(&label)
                .copied()
                .ok_or_else(|| CompileError::UnresolvedLabel(label.clone()))?;
            self.patch_jump(idx, target);
        }
        Ok(())
    }

    /// Lowers `expr`, leaving exactly one value on the operand stack unless
    /// `expr` is a control pseudo-call (`label`/`goto`/`ifnot`), which
    /// leaves none.
    fn lower(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match &expr.kind {
            ExprKind::Literal(lit) => self.lower_literal(lit),
            ExprKind::Var(name) => {
                let (slot, _) = self
                    .locals
                    .resolve(name)
                    .ok_or_else(|| CompileError::UnknownVariable(name.clone()))?;
                self.emit(Opcode::LoadLocal, Operand::U32(slot));
            }
            ExprKind::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs)?,
            ExprKind::Cond { cond, then_branch, else_branch } => {
                self.lower(cond)?;
                let jf = self.emit(Opcode::JumpIfFalse, Operand::Jump(aisl_bytecode::PENDING_JUMP_SENTINEL));
                self.lower(then_branch)?;
                let jend = self.emit(Opcode::Jump, Operand::Jump(aisl_bytecode::PENDING_JUMP_SENTINEL));
                let else_addr = self.current_addr();
                self.patch_jump(jf, else_addr);
                self.lower(else_branch)?;
                let end_addr = self.current_addr();
                self.patch_jump(jend, end_addr);
            }
            ExprKind::Seq(items) => self.lower_seq(items)?,
            ExprKind::Let { bindings, body } => self.lower_let(bindings, body)?,
            ExprKind::Apply { callee, args } => self.lower_apply(callee, args)?,
            ExprKind::Return(value) => {
                match value {
                    Some(v) => self.lower(v)?,
                    None => {
                        self.emit(Opcode::PushUnit, Operand::None);
                    }
                }
                self.emit(Opcode::Return, Operand::None);
            }
            ExprKind::Io { op, args } => self.lower_io(*op, args)?,
            ExprKind::Assign { name, value } => self.lower_assign(name, value)?,
            // Lowered away by the desugarer before codegen ever sees them.
            ExprKind::While { .. } | ExprKind::Loop { .. } | ExprKind::Break | ExprKind::Continue => {
                unreachable!("control-flow nodes are removed by the desugar pass")
            }
        }
        Ok(())
    }

    fn lower_literal(&mut self, lit: &Literal) {
        match lit {
            Literal::Int(i) => {
                self.emit(Opcode::PushInt, Operand::I64(*i));
            }
            Literal::Float(f) => {
                self.emit(Opcode::PushFloat, Operand::F64(*f));
            }
            Literal::Bool(b) => {
                self.emit(Opcode::PushBool, Operand::Bool(*b));
            }
            Literal::String(s) => {
                let idx = self.intern(s);
                self.emit(Opcode::PushString, Operand::U32(idx));
            }
            Literal::Unit => {
                self.emit(Opcode::PushUnit, Operand::None);
            }
        }
    }

    fn lower_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<(), CompileError> {
        let lhs_ty = infer_type(lhs, &self.locals);
        let rhs_ty = infer_type(rhs, &self.locals);
        if lhs_ty != rhs_ty {
            return Err(CompileError::TypeMismatch {
                context: format!("{op:?}"),
                expected: lhs_ty.dispatch_suffix().to_string(),
                found: rhs_ty.dispatch_suffix().to_string(),
            });
        }
        let short_name = match op {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "div",
            BinOp::Eq => "eq",
            BinOp::Lt => "lt",
            BinOp::Gt => "gt",
            BinOp::Le => "le",
            BinOp::Ge => "ge",
        };
        let opcode = dispatch::resolve(short_name, &lhs_ty).ok_or_else(|| CompileError::TypeMismatch {
            context: format!("{op:?}"),
            expected: "a type supporting this operator".to_string(),
            found: lhs_ty.dispatch_suffix().to_string(),
        })?;
        self.lower(lhs)?;
        self.lower(rhs)?;
        self.emit(opcode, Operand::None);
        Ok(())
    }

    fn lower_seq(&mut self, items: &[Expr]) -> Result<(), CompileError> {
        if items.is_empty() {
            self.emit(Opcode::PushUnit, Operand::None);
            return Ok(());
        }
        for (i, item) in items.iter().enumerate() {
            self.lower(item)?;
            let is_last = i == items.len() - 1;
            if !is_last && !desugar::is_control_pseudo_call(item) {
                self.emit(Opcode::Pop, Operand::None);
            }
        }
        Ok(())
    }

    fn lower_let(&mut self, bindings: &[Binding], body: &Expr) -> Result<(), CompileError> {
        self.locals.push_scope();
        for binding in bindings {
            let ty = infer_type(&binding.value, &self.locals);
            self.lower(&binding.value)?;
            let slot = self.locals.declare(&binding.name, ty);
            self.emit(Opcode::StoreLocal, Operand::U32(slot));
        }
        self.lower(body)?;
        self.locals.pop_scope();
        Ok(())
    }

    /// `set_<name>(value)`: reuses `name`'s slot if it's already bound,
    /// otherwise declares a fresh one. Leaves `Unit` on the stack so it can
    /// sit inside a `Seq` like any other ordinary expression.
    fn lower_assign(&mut self, name: &str, value: &Expr) -> Result<(), CompileError> {
        let ty = infer_type(value, &self.locals);
        self.lower(value)?;
        let slot = self.locals.assign(name, ty);
        self.emit(Opcode::StoreLocal, Operand::U32(slot));
        self.emit(Opcode::PushUnit, Operand::None);
        Ok(())
    }

    fn lower_apply(&mut self, callee: &str, args: &[Expr]) -> Result<(), CompileError> {
        match callee {
            desugar::LABEL_CALLEE => {
                let name = string_literal_arg(args, 0)?;
                if self.labels.contains_key(&name) {
                    return Err(CompileError::DuplicateLabel(name));
                }
                let addr = self.current_addr();
                self.labels.insert(name, addr);
                return Ok(());
            }
            desugar::GOTO_CALLEE => {
                let name = string_literal_arg(args, 0)?;
                let idx = self.emit(Opcode::Jump, Operand::Jump(aisl_bytecode::PENDING_JUMP_SENTINEL));
                self.pending_jumps.push((idx, name));
                return Ok(());
            }
            desugar::IFNOT_CALLEE => {
                let name = string_literal_arg(args, 1)?;
                self.lower(&args[0])?;
                let idx =
                    self.emit(Opcode::JumpIfFalse, Operand::Jump(aisl_bytecode::PENDING_JUMP_SENTINEL));
                self.pending_jumps.push((idx, name));
                return Ok(());
            }
            "array_new" => {
                let capacity = match args.first() {
                    None => 0u32,
                    Some(Expr { kind: ExprKind::Literal(Literal::Int(n)), .. }) => *n as u32,
                    Some(_) => {
                        return Err(CompileError::TypeMismatch {
                            context: "array_new".to_string(),
                            expected: "integer literal".to_string(),
                            found: "expression".to_string(),
                        })
                    }
                };
                self.emit(Opcode::ArrayNew, Operand::U32(capacity));
                return Ok(());
            }
            "channel_new" => {
                let capacity = match args.first() {
                    None => 0u32,
                    Some(Expr { kind: ExprKind::Literal(Literal::Int(n)), .. }) => *n as u32,
                    Some(_) => {
                        return Err(CompileError::TypeMismatch {
                            context: "channel_new".to_string(),
                            expected: "integer literal".to_string(),
                            found: "expression".to_string(),
                        })
                    }
                };
                self.emit(Opcode::ChannelNew, Operand::U32(capacity));
                return Ok(());
            }
            "host_call" => {
                let name = string_literal_arg(args, 0)?;
                let name_idx = self.intern(&name);
                for arg in &args[1..] {
                    self.lower(arg)?;
                }
                self.emit(
                    Opcode::HostCall,
                    Operand::Call { func_idx: name_idx, arg_count: (args.len() - 1) as u32 },
                );
                return Ok(());
            }
            "assert_test_case" => {
                return self.lower_assert_test_case(args);
            }
            _ => {}
        }

        if dispatch::is_short_name(callee) {
            let dispatch_ty = args
                .first()
                .map(|a| infer_type(a, &self.locals))
                .unwrap_or(Type::Int);
            let opcode = dispatch::resolve(callee, &dispatch_ty).ok_or_else(|| {
                CompileError::TypeMismatch {
                    context: callee.to_string(),
                    expected: "a supported operand type".to_string(),
                    found: dispatch_ty.dispatch_suffix().to_string(),
                }
            })?;
            for arg in args {
                self.lower(arg)?;
            }
            self.emit(opcode, Operand::None);
            return Ok(());
        }

        if let Some((_, opcode, arity)) = FIXED_BUILTINS.iter().find(|(n, _, _)| *n == callee) {
            if args.len() != *arity {
                return Err(CompileError::ArityMismatch {
                    name: callee.to_string(),
                    expected: *arity,
                    actual: args.len(),
                });
            }
            for arg in args {
                self.lower(arg)?;
            }
            self.emit(*opcode, Operand::None);
            return Ok(());
        }

        let func_idx = *self
            .functions_by_name
            .get(callee)
            .ok_or_else(|| CompileError::UnknownFunction(callee.to_string()))?;
        let expected = self.bc.functions[func_idx as usize].param_count as usize;
        if args.len() != expected {
            return Err(CompileError::ArityMismatch {
                name: callee.to_string(),
                expected,
                actual: args.len(),
            });
        }
        for arg in args {
            self.lower(arg)?;
        }
        self.emit(Opcode::Call, Operand::Call { func_idx, arg_count: args.len() as u32 });
        Ok(())
    }

    /// Lowers the synthetic test-spec assertion: `(actual, expected)` ->
    /// prints a mismatch line with both values on failure, a pass marker on
    /// success.
    fn lower_assert_test_case(&mut self, args: &[Expr]) -> Result<(), CompileError> {
        let actual = &args[0];
        let expected = &args[1];
        let ty = infer_type(expected, &self.locals);
        self.lower(actual)?;
        self.emit(Opcode::Dup, Operand::None);
        self.lower(expected)?;
        let cmp = dispatch::resolve("eq", &ty).ok_or_else(|| CompileError::TypeMismatch {
            context: "assert_test_case".to_string(),
            expected: "a comparable type".to_string(),
            found: ty.dispatch_suffix().to_string(),
        })?;
        self.emit(cmp, Operand::None);
        // Stack now holds just `actual`, kept under the branch so the failure
        // path can still print it.
        let jf = self.emit(Opcode::JumpIfFalse, Operand::Jump(aisl_bytecode::PENDING_JUMP_SENTINEL));

        let str_print = dispatch::resolve("print", &Type::String).expect("print/string is always registered");
        let ty_print = dispatch::resolve("print", &ty).ok_or_else(|| CompileError::TypeMismatch {
            context: "assert_test_case".to_string(),
            expected: "a printable type".to_string(),
            found: ty.dispatch_suffix().to_string(),
        })?;

        // PASS: `actual` is unused here.
        self.emit(Opcode::Pop, Operand::None);
        let ok_idx = self.intern("  - PASS\n");
        self.emit(Opcode::PushString, Operand::U32(ok_idx));
        self.emit(str_print, Operand::None);
        let jend = self.emit(Opcode::Jump, Operand::Jump(aisl_bytecode::PENDING_JUMP_SENTINEL));

        // FAIL: "  - Expected: <expected>, Got: <actual>\n"
        let fail_addr = self.current_addr();
        self.patch_jump(jf, fail_addr);
        let fail_idx = self.intern("  - Expected: ");
        self.emit(Opcode::PushString, Operand::U32(fail_idx));
        self.emit(str_print, Operand::None);
        self.emit(Opcode::Pop, Operand::None);
        self.lower(expected)?;
        self.emit(ty_print, Operand::None);
        self.emit(Opcode::Pop, Operand::None);
        let got_idx = self.intern(", Got: ");
        self.emit(Opcode::PushString, Operand::U32(got_idx));
        self.emit(str_print, Operand::None);
        self.emit(Opcode::Pop, Operand::None);
        // `actual` is still on the stack from before the branch. Its own
        // print opcode supplies the trailing newline.
        self.emit(ty_print, Operand::None);

        let end_addr = self.current_addr();
        self.patch_jump(jend, end_addr);
        Ok(())
    }

    fn lower_io(&mut self, op: IoOp, args: &[Expr]) -> Result<(), CompileError> {
        let (opcode, arity) = match op {
            IoOp::Open => (Opcode::IoOpen, 2),
            IoOp::Read => (Opcode::IoRead, 2),
            IoOp::Write => (Opcode::IoWrite, 2),
            IoOp::Close => (Opcode::IoClose, 1),
        };
        if args.len() != arity {
            return Err(CompileError::ArityMismatch {
                name: format!("{op:?}"),
                expected: arity,
                actual: args.len(),
            });
        }
        for arg in args {
            self.lower(arg)?;
        }
        self.emit(opcode, Operand::None);
        Ok(())
    }
}

fn string_literal_arg(args: &[Expr], index: usize) -> Result<String, CompileError> {
    match args.get(index) {
        Some(Expr { kind: ExprKind::Literal(Literal::String(s)), .. }) => Ok(s.clone()),
        _ => Err(CompileError::UnresolvedLabel(format!("argument {index}"))),
    }
}
