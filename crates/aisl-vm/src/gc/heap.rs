//! Safe, arena-backed heap for the four GC-tracked compound kinds: array,
//! map, json, and host handle/channel objects. A stop-the-world
//! mark-and-sweep; an allocation checks `bytes_allocated + size > next_gc`
//! and collects first if so.

use super::map::MapTable;
use crate::value::{HeapRef, Value};
use std::collections::VecDeque;
use std::fs::File;

const MIN_NEXT_GC: usize = 1024 * 1024;
const GROW_FACTOR: f64 = 2.0;

/// An acquired host resource. `closed` makes a double-close a no-op; the GC
/// never auto-closes this on its own, per the resource model.
#[derive(Debug)]
pub struct FileHandle {
    pub file: File,
    pub closed: bool,
}

#[derive(Debug)]
pub enum HeapObject {
    Array(Vec<Value>),
    Map(MapTable),
    Json(serde_json::Value),
    Channel { queue: VecDeque<Value>, capacity: usize },
    Handle(FileHandle),
}

impl HeapObject {
    fn approx_size(&self) -> usize {
        match self {
            HeapObject::Array(items) => 32 + items.len() * 32,
            HeapObject::Map(map) => 32 + map.len() * 48,
            HeapObject::Json(_) => 64,
            HeapObject::Channel { queue, .. } => 32 + queue.len() * 32,
            HeapObject::Handle(_) => 16,
        }
    }
}

struct Slot {
    object: HeapObject,
    marked: bool,
}

#[derive(Default)]
pub struct Heap {
    slots: Vec<Option<Slot>>,
    free_list: Vec<usize>,
    bytes_allocated: usize,
    next_gc: usize,
    collections_run: u64,
}

pub struct GcStats {
    pub bytes_allocated: usize,
    pub live_objects: usize,
    pub collections_run: u64,
}

impl Heap {
    pub fn new() -> Self {
        Heap { next_gc: MIN_NEXT_GC, ..Default::default() }
    }

    /// Allocates `object`, running a collection first if this allocation
    /// would exceed the current pacing threshold.
    pub fn allocate(&mut self, object: HeapObject, roots: &[Value]) -> HeapRef {
        let size = object.approx_size();
        if self.bytes_allocated + size > self.next_gc {
            self.collect(roots);
        }
        self.bytes_allocated += size;
        if let Some(idx) = self.free_list.pop() {
            self.slots[idx] = Some(Slot { object, marked: false });
            idx
        } else {
            self.slots.push(Some(Slot { object, marked: false }));
            self.slots.len() - 1
        }
    }

    pub fn get(&self, r: HeapRef) -> &HeapObject {
        &self.slots[r].as_ref().expect("dereferenced a freed heap slot").object
    }

    pub fn get_mut(&mut self, r: HeapRef) -> &mut HeapObject {
        &mut self.slots[r].as_mut().expect("dereferenced a freed heap slot").object
    }

    /// Stop-the-world mark-and-sweep over `roots` (the operand stack,
    /// `0..sp`). Frees every unmarked object and clears survivors' mark.
    pub fn collect(&mut self, roots: &[Value]) {
        for slot in self.slots.iter_mut().flatten() {
            slot.marked = false;
        }
        let mut worklist: Vec<HeapRef> = roots.iter().filter_map(heap_ref_of).collect();
        while let Some(r) = worklist.pop() {
            let Some(slot) = self.slots[r].as_mut() else { continue };
            if slot.marked {
                continue;
            }
            slot.marked = true;
            match &slot.object {
                HeapObject::Array(items) => {
                    worklist.extend(items.iter().filter_map(heap_ref_of));
                }
                HeapObject::Map(map) => {
                    worklist.extend(map.values().filter_map(heap_ref_of));
                }
                HeapObject::Channel { queue, .. } => {
                    worklist.extend(queue.iter().filter_map(heap_ref_of));
                }
                HeapObject::Json(_) | HeapObject::Handle(_) => {}
            }
        }

        for (idx, slot) in self.slots.iter_mut().enumerate() {
            let should_free = matches!(slot, Some(s) if !s.marked);
            if should_free {
                let freed = slot.take().unwrap();
                self.bytes_allocated = self.bytes_allocated.saturating_sub(freed.object.approx_size());
                self.free_list.push(idx);
            }
        }
        self.collections_run += 1;
        self.next_gc = (self.bytes_allocated as f64 * GROW_FACTOR).max(MIN_NEXT_GC as f64) as usize;
    }

    pub fn stats(&self) -> GcStats {
        GcStats {
            bytes_allocated: self.bytes_allocated,
            live_objects: self.slots.iter().filter(|s| s.is_some()).count(),
            collections_run: self.collections_run,
        }
    }
}

fn heap_ref_of(value: &Value) -> Option<HeapRef> {
    match value {
        Value::Array(r) | Value::Map(r) | Value::Json(r) | Value::Handle(r) | Value::Channel(r) => {
            Some(*r)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_is_reachable_while_rooted() {
        let mut heap = Heap::new();
        let r = heap.allocate(HeapObject::Array(vec![Value::Int(1)]), &[]);
        let roots = vec![Value::Array(r)];
        heap.collect(&roots);
        assert_eq!(heap.stats().live_objects, 1);
    }

    #[test]
    fn unreachable_allocation_is_swept() {
        let mut heap = Heap::new();
        let _r = heap.allocate(HeapObject::Array(vec![Value::Int(1)]), &[]);
        heap.collect(&[]);
        assert_eq!(heap.stats().live_objects, 0);
    }

    #[test]
    fn array_elements_keep_their_own_heap_objects_alive() {
        let mut heap = Heap::new();
        let inner = heap.allocate(HeapObject::Array(vec![Value::Int(7)]), &[]);
        let outer = heap.allocate(HeapObject::Array(vec![Value::Array(inner)]), &[]);
        heap.collect(&[Value::Array(outer)]);
        assert_eq!(heap.stats().live_objects, 2);
    }

    #[test]
    fn map_values_keep_their_own_heap_objects_alive() {
        let mut heap = Heap::new();
        let inner = heap.allocate(HeapObject::Array(vec![Value::Int(9)]), &[]);
        let mut map = MapTable::new();
        map.set("k".to_string(), Value::Array(inner));
        let outer = heap.allocate(HeapObject::Map(map), &[]);
        heap.collect(&[Value::Map(outer)]);
        assert_eq!(heap.stats().live_objects, 2);
    }

    #[test]
    fn freed_slots_are_reused_by_later_allocations() {
        let mut heap = Heap::new();
        let first = heap.allocate(HeapObject::Array(vec![]), &[]);
        heap.collect(&[]);
        let second = heap.allocate(HeapObject::Array(vec![]), &[]);
        assert_eq!(first, second);
    }
}
