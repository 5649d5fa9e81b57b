//! The VM's tagged value representation. Scalars are held inline; the four
//! compound kinds (`array`, `map`, `json`, host handle) carry an index into
//! the GC-tracked heap.

use crate::decimal::Decimal;
use std::fmt;
use std::rc::Rc;

/// An index into `Heap`'s object arena. Stable across collections: sweeping
/// never relocates survivors, it only frees unmarked slots.
pub type HeapRef = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unit,
    Int(i64),
    Float(f64),
    Bool(bool),
    Decimal(Decimal),
    Str(Rc<str>),
    Array(HeapRef),
    Map(HeapRef),
    Json(HeapRef),
    /// An opaque host resource (file, socket, FFI library, ...), acquired by
    /// an opening opcode and released by its paired closing opcode.
    Handle(HeapRef),
    /// A bounded FIFO queue backing `CHANNEL_NEW` / `SEND` / `RECV`.
    Channel(HeapRef),
    Result(Rc<VmResultValue>),
}

/// The tagged `result` value host-call failures surface through, inspected
/// by `IS_OK` / `IS_ERR` / `UNWRAP` / `UNWRAP_OR` / `ERROR_CODE` / `ERROR_MSG`.
#[derive(Debug, Clone, PartialEq)]
pub enum VmResultValue {
    Ok(Value),
    Err { code: i64, message: String },
}

impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::Str(Rc::from(s.into()))
    }

    pub fn ok(value: Value) -> Value {
        Value::Result(Rc::new(VmResultValue::Ok(value)))
    }

    pub fn err(code: i64, message: impl Into<String>) -> Value {
        Value::Result(Rc::new(VmResultValue::Err { code, message: message.into() }))
    }

    pub fn is_truthy(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    /// Normalises a value to the string form the map implementation keys
    /// entries by: strings pass through, integers are formatted decimal.
    pub fn as_map_key(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Unit => "unit".to_string(),
            other => format!("{other:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "unit"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Array(r) => write!(f, "<array #{r}>"),
            Value::Map(r) => write!(f, "<map #{r}>"),
            Value::Json(r) => write!(f, "<json #{r}>"),
            Value::Handle(r) => write!(f, "<handle #{r}>"),
            Value::Channel(r) => write!(f, "<channel #{r}>"),
            Value::Result(r) => match r.as_ref() {
                VmResultValue::Ok(v) => write!(f, "Ok({v})"),
                VmResultValue::Err { code, message } => write!(f, "Err({code}, {message:?})"),
            },
        }
    }
}
