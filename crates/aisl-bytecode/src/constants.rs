//! The artifact's string constant pool.

use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use rustc_hash::FxHashMap;

/// An ordered pool of string constants, referenced by `u32` index from
/// `PUSH_STRING` and friends. Strings are immutable for the artifact's
/// lifetime and are never reclaimed by the GC.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    strings: Vec<String>,
    dedup: FxHashMap<String, u32>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a string constant, reusing an existing entry if the same string
    /// was already interned (index stability across separate compiles is
    /// not guaranteed or required).
    pub fn intern(&mut self, s: impl Into<String>) -> u32 {
        let s = s.into();
        if let Some(&idx) = self.dedup.get(&s) {
            return idx;
        }
        let idx = self.strings.len() as u32;
        self.dedup.insert(s.clone(), idx);
        self.strings.push(s);
        idx
    }

    pub fn get(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }

    pub fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_u32(self.strings.len() as u32);
        for s in &self.strings {
            writer.emit_string(s);
        }
    }

    pub fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let count = reader.read_u32()? as usize;
        let mut pool = ConstantPool::new();
        for _ in 0..count {
            let s = reader.read_string()?;
            pool.intern(s);
        }
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_deduplicates() {
        let mut pool = ConstantPool::new();
        let a = pool.intern("hello");
        let b = pool.intern("world");
        let c = pool.intern("hello");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn roundtrip() {
        let mut pool = ConstantPool::new();
        pool.intern("a");
        pool.intern("b");
        let mut w = BytecodeWriter::new();
        pool.encode(&mut w);
        let bytes = w.into_bytes();
        let mut r = BytecodeReader::new(&bytes);
        let decoded = ConstantPool::decode(&mut r).unwrap();
        assert_eq!(decoded.get(0), Some("a"));
        assert_eq!(decoded.get(1), Some("b"));
    }
}
