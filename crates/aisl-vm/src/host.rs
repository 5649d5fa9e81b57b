//! Marshalling for the fixed I/O/GC/result opcodes and the generic
//! `HOST_CALL` adapter. Everything here pops typed arguments in source
//! order and pushes exactly one result, per the calling convention every
//! other opcode family follows.

use crate::error::VmError;
use crate::gc::heap::FileHandle;
use crate::gc::{GcStats, Heap, HeapObject};
use crate::stack::Stack;
use crate::value::Value;
use std::fs::OpenOptions;
use std::io::{Read, Write};

pub fn io_open(stack: &mut Stack, heap: &mut Heap) -> Result<(), VmError> {
    let mode = pop_string(stack)?;
    let path = pop_string(stack)?;
    let opened = match mode.as_str() {
        "r" => OpenOptions::new().read(true).open(&path),
        "w" => OpenOptions::new().write(true).create(true).truncate(true).open(&path),
        "a" => OpenOptions::new().append(true).create(true).open(&path),
        _ => OpenOptions::new().read(true).write(true).open(&path),
    };
    let result = match opened {
        Ok(file) => {
            let roots = stack.roots().to_vec();
            let r = heap.allocate(HeapObject::Handle(FileHandle { file, closed: false }), &roots);
            Value::ok(Value::Handle(r))
        }
        Err(e) => Value::err(-1, e.to_string()),
    };
    stack.push(result)
}

pub fn io_read(stack: &mut Stack, heap: &mut Heap) -> Result<(), VmError> {
    let max_bytes = pop_int(stack)?;
    let handle = pop_handle(stack)?;
    let result = match heap.get_mut(handle) {
        HeapObject::Handle(h) if !h.closed => {
            let mut buf = vec![0u8; max_bytes.max(0) as usize];
            match h.file.read(&mut buf) {
                Ok(n) => {
                    buf.truncate(n);
                    Value::ok(Value::string(String::from_utf8_lossy(&buf).into_owned()))
                }
                Err(e) => Value::err(-1, e.to_string()),
            }
        }
        _ => Value::err(-1, "read on a closed handle"),
    };
    stack.push(result)
}

pub fn io_write(stack: &mut Stack, heap: &mut Heap) -> Result<(), VmError> {
    let data = pop_string(stack)?;
    let handle = pop_handle(stack)?;
    let result = match heap.get_mut(handle) {
        HeapObject::Handle(h) if !h.closed => match h.file.write_all(data.as_bytes()) {
            Ok(()) => Value::ok(Value::Int(data.len() as i64)),
            Err(e) => Value::err(-1, e.to_string()),
        },
        _ => Value::err(-1, "write on a closed handle"),
    };
    stack.push(result)
}

pub fn io_close(stack: &mut Stack, heap: &mut Heap) -> Result<(), VmError> {
    let handle = pop_handle(stack)?;
    if let HeapObject::Handle(h) = heap.get_mut(handle) {
        h.closed = true;
    }
    stack.push(Value::Unit)
}

pub fn io_stdin_read(stack: &mut Stack) -> Result<(), VmError> {
    let mut line = String::new();
    let result = match std::io::stdin().read_line(&mut line) {
        Ok(_) => {
            let trimmed = line.trim_end_matches(['\n', '\r']);
            Value::ok(Value::string(trimmed))
        }
        Err(e) => Value::err(-1, e.to_string()),
    };
    stack.push(result)
}

pub fn gc_collect(stack: &mut Stack, heap: &mut Heap) -> Result<(), VmError> {
    let roots = stack.roots().to_vec();
    heap.collect(&roots);
    stack.push(Value::Unit)
}

pub fn gc_stats(stack: &mut Stack, heap: &mut Heap) -> Result<(), VmError> {
    let GcStats { bytes_allocated, live_objects, collections_run } = heap.stats();
    let mut map = crate::gc::MapTable::new();
    map.set("bytes_allocated".to_string(), Value::Int(bytes_allocated as i64));
    map.set("live_objects".to_string(), Value::Int(live_objects as i64));
    map.set("collections_run".to_string(), Value::Int(collections_run as i64));
    let roots = stack.roots().to_vec();
    let r = heap.allocate(HeapObject::Map(map), &roots);
    stack.push(Value::Map(r))
}

pub fn json_parse(stack: &mut Stack, heap: &mut Heap) -> Result<(), VmError> {
    let text = pop_string(stack)?;
    let result = match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(v) => {
            let roots = stack.roots().to_vec();
            let r = heap.allocate(HeapObject::Json(v), &roots);
            Value::ok(Value::Json(r))
        }
        Err(e) => Value::err(-1, e.to_string()),
    };
    stack.push(result)
}

pub fn json_stringify(stack: &mut Stack, heap: &Heap) -> Result<(), VmError> {
    let handle = pop_json(stack)?;
    let HeapObject::Json(v) = heap.get(handle) else {
        return Err(VmError::HostCallFailed("json_stringify on a non-json value".into()));
    };
    stack.push(Value::string(v.to_string()))
}

pub fn channel_new(capacity: u32, stack: &mut Stack, heap: &mut Heap) -> Result<(), VmError> {
    let roots = stack.roots().to_vec();
    let r = heap.allocate(
        HeapObject::Channel { queue: std::collections::VecDeque::new(), capacity: capacity.max(1) as usize },
        &roots,
    );
    stack.push(Value::Channel(r))
}

pub fn channel_send(stack: &mut Stack, heap: &mut Heap) -> Result<(), VmError> {
    let value = stack.pop()?;
    let handle = pop_channel(stack)?;
    match heap.get_mut(handle) {
        HeapObject::Channel { queue, capacity } => {
            if queue.len() >= *capacity {
                return Err(VmError::HostCallFailed("channel send on a full channel".into()));
            }
            queue.push_back(value);
            stack.push(Value::Unit)
        }
        _ => Err(VmError::HostCallFailed("send on a non-channel value".into())),
    }
}

pub fn channel_recv(stack: &mut Stack, heap: &mut Heap) -> Result<(), VmError> {
    let handle = pop_channel(stack)?;
    match heap.get_mut(handle) {
        HeapObject::Channel { queue, .. } => {
            let value = queue.pop_front().unwrap_or(Value::Unit);
            stack.push(value)
        }
        _ => Err(VmError::HostCallFailed("recv on a non-channel value".into())),
    }
}

pub fn is_ok(stack: &mut Stack) -> Result<(), VmError> {
    let v = stack.pop()?;
    let result = matches!(&v, Value::Result(r) if matches!(r.as_ref(), crate::value::VmResultValue::Ok(_)));
    stack.push(Value::Bool(result))
}

pub fn is_err(stack: &mut Stack) -> Result<(), VmError> {
    let v = stack.pop()?;
    let result = matches!(&v, Value::Result(r) if matches!(r.as_ref(), crate::value::VmResultValue::Err{..}));
    stack.push(Value::Bool(result))
}

pub fn unwrap(stack: &mut Stack) -> Result<(), VmError> {
    let v = stack.pop()?;
    match v {
        Value::Result(r) => match r.as_ref() {
            crate::value::VmResultValue::Ok(inner) => stack.push(inner.clone()),
            crate::value::VmResultValue::Err { code, message } => {
                Err(VmError::UnwrapOnErr { code: *code, message: message.clone() })
            }
        },
        other => stack.push(other),
    }
}

pub fn unwrap_or(stack: &mut Stack) -> Result<(), VmError> {
    let fallback = stack.pop()?;
    let v = stack.pop()?;
    match v {
        Value::Result(r) => match r.as_ref() {
            crate::value::VmResultValue::Ok(inner) => stack.push(inner.clone()),
            crate::value::VmResultValue::Err { .. } => stack.push(fallback),
        },
        other => stack.push(other),
    }
}

pub fn error_code(stack: &mut Stack) -> Result<(), VmError> {
    let v = stack.pop()?;
    match v {
        Value::Result(r) => match r.as_ref() {
            crate::value::VmResultValue::Ok(_) => stack.push(Value::Int(0)),
            crate::value::VmResultValue::Err { code, .. } => stack.push(Value::Int(*code)),
        },
        _ => stack.push(Value::Int(0)),
    }
}

pub fn error_msg(stack: &mut Stack) -> Result<(), VmError> {
    let v = stack.pop()?;
    match v {
        Value::Result(r) => match r.as_ref() {
            crate::value::VmResultValue::Ok(_) => stack.push(Value::string("")),
            crate::value::VmResultValue::Err { message, .. } => stack.push(Value::string(message.clone())),
        },
        _ => stack.push(Value::string("")),
    }
}

/// `HOST_CALL name, ...args` — the wider builtin catalogue (network,
/// filesystem extras, process, crypto, regex, SQLite, WebSocket, FFI) that
/// this VM treats as an external collaborator. Every such call is
/// unimplemented here by design: it marshals the name and reports failure
/// through the `result` channel rather than aborting the VM.
pub fn host_call(name: &str, arg_count: u32, stack: &mut Stack) -> Result<(), VmError> {
    let mut args = Vec::with_capacity(arg_count as usize);
    for _ in 0..arg_count {
        args.push(stack.pop()?);
    }
    args.reverse();
    stack.push(Value::err(-1, format!("host function {name:?} is not available in this runtime")))
}

fn pop_string(stack: &mut Stack) -> Result<String, VmError> {
    match stack.pop()? {
        Value::Str(s) => Ok(s.to_string()),
        _ => Err(VmError::HostCallFailed("expected a string argument".into())),
    }
}

fn pop_int(stack: &mut Stack) -> Result<i64, VmError> {
    match stack.pop()? {
        Value::Int(i) => Ok(i),
        _ => Err(VmError::HostCallFailed("expected an int argument".into())),
    }
}

fn pop_handle(stack: &mut Stack) -> Result<crate::value::HeapRef, VmError> {
    match stack.pop()? {
        Value::Handle(r) => Ok(r),
        _ => Err(VmError::HostCallFailed("expected a handle argument".into())),
    }
}

fn pop_json(stack: &mut Stack) -> Result<crate::value::HeapRef, VmError> {
    match stack.pop()? {
        Value::Json(r) => Ok(r),
        _ => Err(VmError::HostCallFailed("expected a json argument".into())),
    }
}

fn pop_channel(stack: &mut Stack) -> Result<crate::value::HeapRef, VmError> {
    match stack.pop()? {
        Value::Channel(r) => Ok(r),
        _ => Err(VmError::HostCallFailed("expected a channel argument".into())),
    }
}
