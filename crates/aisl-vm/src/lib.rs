//! The AISL stack machine: fetch-decode-execute over a linked [`Module`],
//! a unified operand/call [`Stack`], and a GC-tracked [`Heap`] for the four
//! compound value kinds.

pub mod decimal;
pub mod error;
pub mod gc;
pub mod host;
pub mod stack;
pub mod value;

pub use decimal::Decimal;
pub use error::VmError;
pub use gc::{GcStats, Heap, HeapObject, MapTable};
pub use stack::{CallFrame, Stack};
pub use value::{HeapRef, Value, VmResultValue};

use aisl_bytecode::{Module, Opcode, Operand};
use std::cmp::Ordering;

/// Top-level VM state. Single-threaded, non-reentrant: the dispatch loop
/// owns every piece of mutable state and runs an instruction to completion
/// before observing anything else.
pub struct Vm {
    module: Module,
    stack: Stack,
    heap: Heap,
    ip: u32,
}

impl Vm {
    pub fn new(module: Module) -> Self {
        Vm { module, stack: Stack::new(), heap: Heap::new(), ip: 0 }
    }

    /// Locates `main`, builds its initial frame, and runs the dispatch loop
    /// until a `RETURN` unwinds the outermost frame or `HALT` fires. Returns
    /// the process exit code: `main`'s returned `int`, or 0 for any other
    /// return type.
    pub fn run(&mut self) -> Result<i32, VmError> {
        let (main_idx, main_fn) =
            self.module.find_function("main").ok_or(VmError::UnresolvedFunction)?;
        let return_addr = self.module.instructions.len() as u32;
        self.stack.push_frame(main_idx as u32, return_addr, 0, main_fn.local_count)?;
        self.ip = main_fn.start_addr;

        loop {
            match self.step()? {
                Some(exit_value) => return Ok(exit_code_of(&exit_value)),
                None => continue,
            }
        }
    }

    /// Executes one instruction. Returns `Some(value)` once the outermost
    /// frame has returned (or `HALT` fires), where `value` is the program's
    /// result.
    fn step(&mut self) -> Result<Option<Value>, VmError> {
        let instr = *self
            .module
            .instructions
            .get(self.ip as usize)
            .ok_or(VmError::InvalidOpcode(0))?;
        let opcode = instr.opcode;
        let operand = instr.operand;
        self.ip += 1;

        match opcode {
            // ===== Stack manipulation & constants =====
            Opcode::PushInt => {
                let Operand::I64(v) = operand else { unreachable!() };
                self.stack.push(Value::Int(v))?;
            }
            Opcode::PushFloat => {
                let Operand::F64(v) = operand else { unreachable!() };
                self.stack.push(Value::Float(v))?;
            }
            Opcode::PushBool => {
                let Operand::Bool(v) = operand else { unreachable!() };
                self.stack.push(Value::Bool(v))?;
            }
            Opcode::PushString => {
                let Operand::U32(idx) = operand else { unreachable!() };
                let s = self.module.strings.get(idx).unwrap_or_default();
                self.stack.push(Value::string(s))?;
            }
            Opcode::PushUnit => self.stack.push(Value::Unit)?,
            Opcode::Pop => {
                self.stack.pop()?;
            }
            Opcode::Dup => {
                let top = self.stack.peek()?.clone();
                self.stack.push(top)?;
            }

            // ===== Locals =====
            Opcode::LoadLocal => {
                let Operand::U32(slot) = operand else { unreachable!() };
                let v = self.stack.load_local(slot)?;
                self.stack.push(v)?;
            }
            Opcode::StoreLocal => {
                let Operand::U32(slot) = operand else { unreachable!() };
                let v = self.stack.pop()?;
                self.stack.store_local(slot, v)?;
            }

            // ===== i64 arithmetic =====
            Opcode::AddI64 => self.binop_i64(i64::wrapping_add)?,
            Opcode::SubI64 => self.binop_i64(i64::wrapping_sub)?,
            Opcode::MulI64 => self.binop_i64(i64::wrapping_mul)?,
            Opcode::DivI64 => self.checked_binop_i64(|a, b| a.checked_div(b))?,
            Opcode::ModI64 => self.checked_binop_i64(|a, b| a.checked_rem(b))?,
            Opcode::NegI64 => self.unop_i64(i64::wrapping_neg)?,
            Opcode::AbsI64 => self.unop_i64(i64::wrapping_abs)?,
            Opcode::MinI64 => self.binop_i64(i64::min)?,
            Opcode::MaxI64 => self.binop_i64(i64::max)?,
            Opcode::PowI64 => self.binop_i64(|a, b| a.wrapping_pow(b.max(0) as u32))?,

            // ===== f64 arithmetic =====
            Opcode::AddF64 => self.binop_f64(|a, b| a + b)?,
            Opcode::SubF64 => self.binop_f64(|a, b| a - b)?,
            Opcode::MulF64 => self.binop_f64(|a, b| a * b)?,
            Opcode::DivF64 => self.binop_f64(|a, b| a / b)?,
            Opcode::ModF64 => self.binop_f64(|a, b| a % b)?,
            Opcode::NegF64 => self.unop_f64(|a| -a)?,
            Opcode::AbsF64 => self.unop_f64(f64::abs)?,
            Opcode::MinF64 => self.binop_f64(f64::min)?,
            Opcode::MaxF64 => self.binop_f64(f64::max)?,
            Opcode::SqrtF64 => self.unop_f64(f64::sqrt)?,
            Opcode::PowF64 => self.binop_f64(f64::powf)?,

            // ===== decimal arithmetic =====
            Opcode::AddDecimal => self.binop_decimal(|a, b| Ok(a.add(b)))?,
            Opcode::SubDecimal => self.binop_decimal(|a, b| Ok(a.sub(b)))?,
            Opcode::MulDecimal => self.binop_decimal(|a, b| Ok(a.mul(b)))?,
            Opcode::DivDecimal => self.binop_decimal(Decimal::div)?,
            Opcode::ModDecimal => self.binop_decimal(Decimal::rem)?,
            Opcode::NegDecimal => self.unop_decimal(Decimal::neg)?,
            Opcode::AbsDecimal => self.unop_decimal(Decimal::abs)?,
            Opcode::MinDecimal => self.binop_decimal(|a, b| Ok(a.min(b)))?,
            Opcode::MaxDecimal => self.binop_decimal(|a, b| Ok(a.max(b)))?,

            // ===== i64 comparison =====
            Opcode::EqI64 => self.cmp_i64(|o| o == Ordering::Equal)?,
            Opcode::NeI64 => self.cmp_i64(|o| o != Ordering::Equal)?,
            Opcode::LtI64 => self.cmp_i64(|o| o == Ordering::Less)?,
            Opcode::GtI64 => self.cmp_i64(|o| o == Ordering::Greater)?,
            Opcode::LeI64 => self.cmp_i64(|o| o != Ordering::Greater)?,
            Opcode::GeI64 => self.cmp_i64(|o| o != Ordering::Less)?,

            // ===== f64 comparison (NaN-aware: unordered compares false, NE true) =====
            Opcode::EqF64 => self.cmp_f64(|a, b| a == b)?,
            Opcode::NeF64 => self.cmp_f64(|a, b| a != b)?,
            Opcode::LtF64 => self.cmp_f64(|a, b| a < b)?,
            Opcode::GtF64 => self.cmp_f64(|a, b| a > b)?,
            Opcode::LeF64 => self.cmp_f64(|a, b| a <= b)?,
            Opcode::GeF64 => self.cmp_f64(|a, b| a >= b)?,

            // ===== decimal comparison =====
            Opcode::EqDecimal => self.cmp_decimal(|o| o == Ordering::Equal)?,
            Opcode::NeDecimal => self.cmp_decimal(|o| o != Ordering::Equal)?,
            Opcode::LtDecimal => self.cmp_decimal(|o| o == Ordering::Less)?,
            Opcode::GtDecimal => self.cmp_decimal(|o| o == Ordering::Greater)?,
            Opcode::LeDecimal => self.cmp_decimal(|o| o != Ordering::Greater)?,
            Opcode::GeDecimal => self.cmp_decimal(|o| o != Ordering::Less)?,

            // ===== Logical (non-short-circuit) =====
            Opcode::AndBool => self.binop_bool(|a, b| a && b)?,
            Opcode::OrBool => self.binop_bool(|a, b| a || b)?,
            Opcode::NotBool => {
                let a = pop_bool(&mut self.stack)?;
                self.stack.push(Value::Bool(!a))?;
            }
            Opcode::EqBool => self.binop_bool(|a, b| a == b)?,
            Opcode::NeBool => self.binop_bool(|a, b| a != b)?,

            // ===== Control flow =====
            Opcode::Jump => {
                let Operand::Jump(target) = operand else { unreachable!() };
                self.ip = target;
            }
            Opcode::JumpIfFalse => {
                let Operand::Jump(target) = operand else { unreachable!() };
                if !self.stack.pop()?.is_truthy() {
                    self.ip = target;
                }
            }
            Opcode::JumpIfTrue => {
                let Operand::Jump(target) = operand else { unreachable!() };
                if self.stack.pop()?.is_truthy() {
                    self.ip = target;
                }
            }
            Opcode::Call => {
                let Operand::Call { func_idx, arg_count } = operand else { unreachable!() };
                let function = self
                    .module
                    .functions
                    .get(func_idx as usize)
                    .ok_or(VmError::UnresolvedFunction)?;
                self.stack.push_frame(func_idx, self.ip, arg_count, function.local_count)?;
                self.ip = function.start_addr;
            }
            Opcode::Return => {
                let frame = self.stack.pop_frame()?;
                if self.stack.frame_count() == 0 {
                    return Ok(Some(self.stack.pop()?));
                }
                self.ip = frame.return_addr;
            }
            Opcode::Halt => return Ok(Some(Value::Int(0))),

            // ===== String operations =====
            Opcode::StrLen => {
                let s = pop_string(&mut self.stack)?;
                self.stack.push(Value::Int(s.len() as i64))?;
            }
            Opcode::StrConcat => {
                let b = pop_string(&mut self.stack)?;
                let a = pop_string(&mut self.stack)?;
                self.stack.push(Value::string(format!("{a}{b}")))?;
            }
            Opcode::StrSlice => {
                let length = pop_int(&mut self.stack)?;
                let start = pop_int(&mut self.stack)?;
                let s = pop_string(&mut self.stack)?;
                self.stack.push(Value::string(clamped_slice(&s, start, length)))?;
            }
            Opcode::StrIndexGet => {
                let i = pop_int(&mut self.stack)?;
                let s = pop_string(&mut self.stack)?;
                let byte = usize::try_from(i).ok().and_then(|i| s.as_bytes().get(i).copied());
                self.stack.push(Value::Int(byte.map(i64::from).unwrap_or(-1)))?;
            }
            Opcode::StrEq => self.cmp_str(|o| o == Ordering::Equal)?,
            Opcode::StrNe => self.cmp_str(|o| o != Ordering::Equal)?,
            Opcode::StrLt => self.cmp_str(|o| o == Ordering::Less)?,
            Opcode::StrLe => self.cmp_str(|o| o != Ordering::Greater)?,
            Opcode::StrGt => self.cmp_str(|o| o == Ordering::Greater)?,
            Opcode::StrGe => self.cmp_str(|o| o != Ordering::Less)?,
            Opcode::StrFromI64 => {
                let v = pop_int(&mut self.stack)?;
                self.stack.push(Value::string(v.to_string()))?;
            }
            Opcode::StrFromF64 => {
                let v = pop_float(&mut self.stack)?;
                self.stack.push(Value::string(v.to_string()))?;
            }
            Opcode::StrFromBool => {
                let v = pop_bool(&mut self.stack)?;
                self.stack.push(Value::string(v.to_string()))?;
            }
            Opcode::StrFromDecimal => {
                let v = pop_decimal(&mut self.stack)?;
                self.stack.push(Value::string(v.to_string()))?;
            }
            Opcode::StrSplit => {
                let delim = pop_string(&mut self.stack)?;
                let s = pop_string(&mut self.stack)?;
                let parts: Vec<Value> = if delim.is_empty() {
                    vec![Value::string(s)]
                } else {
                    s.split(delim.as_str()).map(Value::string).collect()
                };
                let roots = self.stack.roots().to_vec();
                let r = self.heap.allocate(HeapObject::Array(parts), &roots);
                self.stack.push(Value::Array(r))?;
            }
            Opcode::StrTrim => {
                let s = pop_string(&mut self.stack)?;
                self.stack.push(Value::string(s.trim().to_string()))?;
            }

            // ===== Array operations =====
            Opcode::ArrayNew => {
                let Operand::U32(capacity) = operand else { unreachable!() };
                let roots = self.stack.roots().to_vec();
                let r = self
                    .heap
                    .allocate(HeapObject::Array(Vec::with_capacity(capacity.max(1) as usize)), &roots);
                self.stack.push(Value::Array(r))?;
            }
            Opcode::ArrayPush => {
                let value = self.stack.pop()?;
                let handle = pop_array(&mut self.stack)?;
                let HeapObject::Array(items) = self.heap.get_mut(handle) else {
                    return Err(VmError::HostCallFailed("push on a non-array value".into()));
                };
                items.push(value);
                self.stack.push(Value::Unit)?;
            }
            Opcode::ArrayGet => {
                let i = pop_int(&mut self.stack)?;
                let handle = pop_array(&mut self.stack)?;
                let HeapObject::Array(items) = self.heap.get(handle) else {
                    return Err(VmError::HostCallFailed("get on a non-array value".into()));
                };
                let v = usize::try_from(i).ok().and_then(|i| items.get(i)).cloned();
                self.stack.push(v.unwrap_or(Value::Unit))?;
            }
            Opcode::ArraySet => {
                let value = self.stack.pop()?;
                let i = pop_int(&mut self.stack)?;
                let handle = pop_array(&mut self.stack)?;
                let HeapObject::Array(items) = self.heap.get_mut(handle) else {
                    return Err(VmError::HostCallFailed("set on a non-array value".into()));
                };
                if let Some(slot) = usize::try_from(i).ok().and_then(|i| items.get_mut(i)) {
                    *slot = value;
                }
                self.stack.push(Value::Unit)?;
            }
            Opcode::ArrayLen => {
                let handle = pop_array(&mut self.stack)?;
                let HeapObject::Array(items) = self.heap.get(handle) else {
                    return Err(VmError::HostCallFailed("length on a non-array value".into()));
                };
                self.stack.push(Value::Int(items.len() as i64))?;
            }

            // ===== Map operations =====
            Opcode::MapNew => {
                let roots = self.stack.roots().to_vec();
                let r = self.heap.allocate(HeapObject::Map(MapTable::new()), &roots);
                self.stack.push(Value::Map(r))?;
            }
            Opcode::MapSet => {
                let value = self.stack.pop()?;
                let key = self.stack.pop()?.as_map_key();
                let handle = pop_map(&mut self.stack)?;
                let HeapObject::Map(map) = self.heap.get_mut(handle) else {
                    return Err(VmError::HostCallFailed("set on a non-map value".into()));
                };
                map.set(key, value);
                self.stack.push(Value::Unit)?;
            }
            Opcode::MapGet => {
                let key = self.stack.pop()?.as_map_key();
                let handle = pop_map(&mut self.stack)?;
                let HeapObject::Map(map) = self.heap.get(handle) else {
                    return Err(VmError::HostCallFailed("get on a non-map value".into()));
                };
                self.stack.push(map.get(&key).cloned().unwrap_or(Value::Unit))?;
            }
            Opcode::MapHas => {
                let key = self.stack.pop()?.as_map_key();
                let handle = pop_map(&mut self.stack)?;
                let HeapObject::Map(map) = self.heap.get(handle) else {
                    return Err(VmError::HostCallFailed("has on a non-map value".into()));
                };
                self.stack.push(Value::Bool(map.has(&key)))?;
            }
            Opcode::MapDelete => {
                let key = self.stack.pop()?.as_map_key();
                let handle = pop_map(&mut self.stack)?;
                let HeapObject::Map(map) = self.heap.get_mut(handle) else {
                    return Err(VmError::HostCallFailed("delete on a non-map value".into()));
                };
                self.stack.push(Value::Bool(map.delete(&key)))?;
            }
            Opcode::MapLen => {
                let handle = pop_map(&mut self.stack)?;
                let HeapObject::Map(map) = self.heap.get(handle) else {
                    return Err(VmError::HostCallFailed("length on a non-map value".into()));
                };
                self.stack.push(Value::Int(map.len() as i64))?;
            }
            Opcode::MapKeys => {
                let handle = pop_map(&mut self.stack)?;
                let HeapObject::Map(map) = self.heap.get(handle) else {
                    return Err(VmError::HostCallFailed("keys on a non-map value".into()));
                };
                let keys: Vec<Value> = map.keys().map(Value::string).collect();
                let roots = self.stack.roots().to_vec();
                let r = self.heap.allocate(HeapObject::Array(keys), &roots);
                self.stack.push(Value::Array(r))?;
            }

            // ===== I/O, host calls, result inspection, GC =====
            Opcode::IoOpen => host::io_open(&mut self.stack, &mut self.heap)?,
            Opcode::IoRead => host::io_read(&mut self.stack, &mut self.heap)?,
            Opcode::IoWrite => host::io_write(&mut self.stack, &mut self.heap)?,
            Opcode::IoClose => host::io_close(&mut self.stack, &mut self.heap)?,
            Opcode::IoStdinRead => host::io_stdin_read(&mut self.stack)?,
            Opcode::PrintI64 => {
                let v = pop_int(&mut self.stack)?;
                println!("{v}");
                self.stack.push(Value::Unit)?;
            }
            Opcode::PrintF64 => {
                let v = pop_float(&mut self.stack)?;
                println!("{v}");
                self.stack.push(Value::Unit)?;
            }
            Opcode::PrintBool => {
                let v = pop_bool(&mut self.stack)?;
                println!("{v}");
                self.stack.push(Value::Unit)?;
            }
            Opcode::PrintString => {
                let v = pop_string(&mut self.stack)?;
                println!("{v}");
                self.stack.push(Value::Unit)?;
            }
            Opcode::PrintArray => {
                let handle = pop_array(&mut self.stack)?;
                let HeapObject::Array(items) = self.heap.get(handle) else {
                    return Err(VmError::HostCallFailed("print on a non-array value".into()));
                };
                let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                println!("[{}]", rendered.join(", "));
                self.stack.push(Value::Unit)?;
            }
            Opcode::PrintMap => {
                let handle = pop_map(&mut self.stack)?;
                let HeapObject::Map(map) = self.heap.get(handle) else {
                    return Err(VmError::HostCallFailed("print on a non-map value".into()));
                };
                let mut keys: Vec<&str> = map.keys().collect();
                keys.sort_unstable();
                let rendered: Vec<String> = keys
                    .into_iter()
                    .map(|k| format!("{k}: {}", map.get(k).map(Value::to_string).unwrap_or_default()))
                    .collect();
                println!("{{{}}}", rendered.join(", "));
                self.stack.push(Value::Unit)?;
            }
            Opcode::PrintDecimal => {
                let v = pop_decimal(&mut self.stack)?;
                println!("{v}");
                self.stack.push(Value::Unit)?;
            }
            Opcode::GcCollect => host::gc_collect(&mut self.stack, &mut self.heap)?,
            Opcode::GcStats => host::gc_stats(&mut self.stack, &mut self.heap)?,
            Opcode::HostCall => {
                let Operand::Call { func_idx, arg_count } = operand else { unreachable!() };
                let name = self.module.strings.get(func_idx).unwrap_or_default().to_string();
                host::host_call(&name, arg_count, &mut self.stack)?;
            }

            // ===== JSON, channels, result =====
            Opcode::JsonParse => host::json_parse(&mut self.stack, &mut self.heap)?,
            Opcode::JsonStringify => host::json_stringify(&mut self.stack, &self.heap)?,
            Opcode::ChannelNew => {
                let Operand::U32(capacity) = operand else { unreachable!() };
                host::channel_new(capacity, &mut self.stack, &mut self.heap)?;
            }
            Opcode::ChannelSend => host::channel_send(&mut self.stack, &mut self.heap)?,
            Opcode::ChannelRecv => host::channel_recv(&mut self.stack, &mut self.heap)?,
            Opcode::IsOk => host::is_ok(&mut self.stack)?,
            Opcode::IsErr => host::is_err(&mut self.stack)?,
            Opcode::Unwrap => host::unwrap(&mut self.stack)?,
            Opcode::UnwrapOr => host::unwrap_or(&mut self.stack)?,
            Opcode::ErrorCode => host::error_code(&mut self.stack)?,
            Opcode::ErrorMsg => host::error_msg(&mut self.stack)?,
        }
        Ok(None)
    }

    fn binop_i64(&mut self, f: impl Fn(i64, i64) -> i64) -> Result<(), VmError> {
        let b = pop_int(&mut self.stack)?;
        let a = pop_int(&mut self.stack)?;
        self.stack.push(Value::Int(f(a, b)))
    }

    fn checked_binop_i64(&mut self, f: impl Fn(i64, i64) -> Option<i64>) -> Result<(), VmError> {
        let b = pop_int(&mut self.stack)?;
        let a = pop_int(&mut self.stack)?;
        let result = f(a, b).ok_or(VmError::DivisionByZero)?;
        self.stack.push(Value::Int(result))
    }

    fn unop_i64(&mut self, f: impl Fn(i64) -> i64) -> Result<(), VmError> {
        let a = pop_int(&mut self.stack)?;
        self.stack.push(Value::Int(f(a)))
    }

    fn binop_f64(&mut self, f: impl Fn(f64, f64) -> f64) -> Result<(), VmError> {
        let b = pop_float(&mut self.stack)?;
        let a = pop_float(&mut self.stack)?;
        self.stack.push(Value::Float(f(a, b)))
    }

    fn unop_f64(&mut self, f: impl Fn(f64) -> f64) -> Result<(), VmError> {
        let a = pop_float(&mut self.stack)?;
        self.stack.push(Value::Float(f(a)))
    }

    fn binop_decimal(
        &mut self,
        f: impl Fn(Decimal, Decimal) -> Result<Decimal, VmError>,
    ) -> Result<(), VmError> {
        let b = pop_decimal(&mut self.stack)?;
        let a = pop_decimal(&mut self.stack)?;
        self.stack.push(Value::Decimal(f(a, b)?))
    }

    fn unop_decimal(&mut self, f: impl Fn(Decimal) -> Decimal) -> Result<(), VmError> {
        let a = pop_decimal(&mut self.stack)?;
        self.stack.push(Value::Decimal(f(a)))
    }

    fn binop_bool(&mut self, f: impl Fn(bool, bool) -> bool) -> Result<(), VmError> {
        let b = pop_bool(&mut self.stack)?;
        let a = pop_bool(&mut self.stack)?;
        self.stack.push(Value::Bool(f(a, b)))
    }

    fn cmp_i64(&mut self, f: impl Fn(Ordering) -> bool) -> Result<(), VmError> {
        let b = pop_int(&mut self.stack)?;
        let a = pop_int(&mut self.stack)?;
        self.stack.push(Value::Bool(f(a.cmp(&b))))
    }

    fn cmp_f64(&mut self, f: impl Fn(f64, f64) -> bool) -> Result<(), VmError> {
        let b = pop_float(&mut self.stack)?;
        let a = pop_float(&mut self.stack)?;
        self.stack.push(Value::Bool(f(a, b)))
    }

    fn cmp_decimal(&mut self, f: impl Fn(Ordering) -> bool) -> Result<(), VmError> {
        let b = pop_decimal(&mut self.stack)?;
        let a = pop_decimal(&mut self.stack)?;
        self.stack.push(Value::Bool(f(a.cmp(&b))))
    }

    fn cmp_str(&mut self, f: impl Fn(Ordering) -> bool) -> Result<(), VmError> {
        let b = pop_string(&mut self.stack)?;
        let a = pop_string(&mut self.stack)?;
        self.stack.push(Value::Bool(f(a.cmp(&b))))
    }
}

fn exit_code_of(value: &Value) -> i32 {
    match value {
        Value::Int(i) => *i as i32,
        _ => 0,
    }
}

/// Clamps `start`/`length` into `s`'s byte range; negative arguments clamp
/// to zero.
fn clamped_slice(s: &str, start: i64, length: i64) -> String {
    let bytes = s.as_bytes();
    let start = start.max(0) as usize;
    let length = length.max(0) as usize;
    let start = start.min(bytes.len());
    let end = start.saturating_add(length).min(bytes.len());
    String::from_utf8_lossy(&bytes[start..end]).into_owned()
}

fn pop_int(stack: &mut Stack) -> Result<i64, VmError> {
    match stack.pop()? {
        Value::Int(i) => Ok(i),
        _ => Err(VmError::HostCallFailed("expected an int operand".into())),
    }
}

fn pop_float(stack: &mut Stack) -> Result<f64, VmError> {
    match stack.pop()? {
        Value::Float(f) => Ok(f),
        _ => Err(VmError::HostCallFailed("expected a float operand".into())),
    }
}

fn pop_bool(stack: &mut Stack) -> Result<bool, VmError> {
    match stack.pop()? {
        Value::Bool(b) => Ok(b),
        _ => Err(VmError::HostCallFailed("expected a bool operand".into())),
    }
}

fn pop_decimal(stack: &mut Stack) -> Result<Decimal, VmError> {
    match stack.pop()? {
        Value::Decimal(d) => Ok(d),
        _ => Err(VmError::HostCallFailed("expected a decimal operand".into())),
    }
}

fn pop_string(stack: &mut Stack) -> Result<String, VmError> {
    match stack.pop()? {
        Value::Str(s) => Ok(s.to_string()),
        _ => Err(VmError::HostCallFailed("expected a string operand".into())),
    }
}

fn pop_array(stack: &mut Stack) -> Result<HeapRef, VmError> {
    match stack.pop()? {
        Value::Array(r) => Ok(r),
        _ => Err(VmError::HostCallFailed("expected an array operand".into())),
    }
}

fn pop_map(stack: &mut Stack) -> Result<HeapRef, VmError> {
    match stack.pop()? {
        Value::Map(r) => Ok(r),
        _ => Err(VmError::HostCallFailed("expected a map operand".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aisl_bytecode::{FunctionEntry, Instruction, Operand};

    fn module_with(instructions: Vec<Instruction>, local_count: u32) -> Module {
        let mut m = Module::new();
        m.instructions = instructions;
        m.functions.push(FunctionEntry {
            name: "main".to_string(),
            start_addr: 0,
            local_count,
            param_count: 0,
        });
        m
    }

    #[test]
    fn arithmetic_and_print_runs_to_completion() {
        let instrs = vec![
            Instruction::new(Opcode::PushInt, Operand::I64(2)),
            Instruction::new(Opcode::PushInt, Operand::I64(3)),
            Instruction::nullary(Opcode::AddI64),
            Instruction::nullary(Opcode::PrintI64),
            Instruction::new(Opcode::PushInt, Operand::I64(0)),
            Instruction::nullary(Opcode::Return),
        ];
        let mut vm = Vm::new(module_with(instrs, 0));
        assert_eq!(vm.run().unwrap(), 0);
    }

    #[test]
    fn division_by_zero_is_fatal() {
        let instrs = vec![
            Instruction::new(Opcode::PushInt, Operand::I64(1)),
            Instruction::new(Opcode::PushInt, Operand::I64(0)),
            Instruction::nullary(Opcode::DivI64),
            Instruction::nullary(Opcode::Return),
        ];
        let mut vm = Vm::new(module_with(instrs, 0));
        assert_eq!(vm.run(), Err(VmError::DivisionByZero));
    }

    #[test]
    fn recursive_call_returns_through_nested_frames() {
        // fn double(n) { return n + n } ; main() { return call double(21) }
        let mut m = Module::new();
        m.instructions = vec![
            // double: locals = [n]
            Instruction::new(Opcode::LoadLocal, Operand::U32(0)),
            Instruction::new(Opcode::LoadLocal, Operand::U32(0)),
            Instruction::nullary(Opcode::AddI64),
            Instruction::nullary(Opcode::Return),
            // main:
            Instruction::new(Opcode::PushInt, Operand::I64(21)),
            Instruction::new(Opcode::Call, Operand::Call { func_idx: 0, arg_count: 1 }),
            Instruction::nullary(Opcode::Return),
        ];
        m.functions.push(FunctionEntry {
            name: "double".to_string(),
            start_addr: 0,
            local_count: 1,
            param_count: 1,
        });
        m.functions.push(FunctionEntry {
            name: "main".to_string(),
            start_addr: 4,
            local_count: 0,
            param_count: 0,
        });
        let mut vm = Vm::new(m);
        assert_eq!(vm.run().unwrap(), 42);
    }

    #[test]
    fn array_push_and_get_round_trip() {
        let instrs = vec![
            Instruction::new(Opcode::ArrayNew, Operand::U32(2)),
            Instruction::nullary(Opcode::Dup),
            Instruction::new(Opcode::PushInt, Operand::I64(7)),
            Instruction::nullary(Opcode::ArrayPush),
            Instruction::nullary(Opcode::Pop),
            Instruction::new(Opcode::PushInt, Operand::I64(0)),
            Instruction::nullary(Opcode::ArrayGet),
            Instruction::nullary(Opcode::Return),
        ];
        let mut vm = Vm::new(module_with(instrs, 0));
        assert_eq!(vm.run().unwrap(), 7);
    }
}
