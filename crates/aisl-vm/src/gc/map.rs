//! A separate-chained hash table, initially 16 buckets, keyed by each
//! value's normalised string form.

use crate::value::Value;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

const INITIAL_BUCKETS: usize = 16;

#[derive(Debug, Clone, Default)]
pub struct MapTable {
    buckets: Vec<Vec<(String, Value)>>,
}

impl MapTable {
    pub fn new() -> Self {
        MapTable { buckets: vec![Vec::new(); INITIAL_BUCKETS] }
    }

    fn bucket_index(&self, key: &str) -> usize {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.buckets.len()
    }

    pub fn set(&mut self, key: String, value: Value) {
        let idx = self.bucket_index(&key);
        let bucket = &mut self.buckets[idx];
        if let Some(entry) = bucket.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            bucket.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        let idx = self.bucket_index(key);
        self.buckets[idx].iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn delete(&mut self, key: &str) -> bool {
        let idx = self.bucket_index(key);
        let bucket = &mut self.buckets[idx];
        if let Some(pos) = bucket.iter().position(|(k, _)| k == key) {
            bucket.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().flatten().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.buckets.iter().flatten().map(|(_, v)| v)
    }
}
