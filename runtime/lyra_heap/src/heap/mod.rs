//! The heap proper: region management, allocation, typed accessors.

use crate::collect::{CollectSummary, Relocator};
use crate::stats::GcStats;
use crate::trace::Trace;
use lyra_value::{
    FrameData, NodeData, ObjData, Object, ProcData, Ref, SymbolData, Value, ValueStore,
};

#[cfg(test)]
mod tests;

/// Smallest region the heap will operate with.
const MIN_CAPACITY: usize = 64;

/// Heap configuration.
#[derive(Clone, Copy, Debug)]
pub struct HeapConfig {
    /// Capacity of the first region, in slots.
    pub initial_capacity: usize,
    /// Post-collection occupancy above which the next region doubles.
    pub load_factor: f64,
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            initial_capacity: 4096,
            load_factor: 0.75,
        }
    }
}

/// Error raised by allocation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HeapError {
    /// The active region is full. The machine collects and retries; this
    /// variant never escapes a correctly wired machine.
    #[error("heap region full: {capacity} slots live")]
    RegionFull {
        /// The full region's capacity.
        capacity: usize,
    },
    /// Even a grown region cannot hold the live set. Fatal.
    #[error("heap exhausted: {live} live slots with capacity {capacity}")]
    Exhausted {
        /// Live slots after the final collection.
        live: usize,
        /// The final region capacity.
        capacity: usize,
    },
}

/// The slot-arena heap.
pub struct Heap {
    /// The active region. `Ref`s index into it.
    active: Vec<Object>,
    /// Slot capacity of the active region.
    capacity: usize,
    /// Whether the next collection should double capacity.
    grow_next: bool,
    /// Occupancy threshold for the growth policy.
    load_factor: f64,
    /// Lifetime counters.
    stats: GcStats,
}

impl Heap {
    /// A heap with one empty region of the configured capacity.
    pub fn new(config: HeapConfig) -> Self {
        let capacity = config.initial_capacity.max(MIN_CAPACITY);
        Heap {
            active: Vec::with_capacity(capacity),
            capacity,
            grow_next: false,
            load_factor: config.load_factor,
            stats: GcStats {
                capacity,
                ..GcStats::default()
            },
        }
    }

    /// Lifetime counters.
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    /// Current region capacity in slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Occupied slots in the active region.
    pub fn live_slots(&self) -> usize {
        self.active.len()
    }

    /// Unoccupied slots remaining in the active region.
    pub fn free_slots(&self) -> usize {
        self.capacity - self.active.len()
    }

    /// Request that the next collection double the region capacity,
    /// regardless of the load-factor policy.
    pub fn request_growth(&mut self) {
        self.grow_next = true;
    }

    /// Allocate one slot. Fails with `RegionFull` when the region is at
    /// capacity; the caller is expected to collect and retry once.
    pub fn alloc(&mut self, object: Object) -> Result<Ref, HeapError> {
        if self.active.len() >= self.capacity {
            return Err(HeapError::RegionFull {
                capacity: self.capacity,
            });
        }
        let r = Ref::from_raw(self.active.len() as u32);
        self.active.push(object);
        self.stats.total_allocated += 1;
        Ok(r)
    }

    /// The object at `r`. An out-of-range or stale ref is an internal
    /// invariant violation.
    pub fn object(&self, r: Ref) -> &Object {
        &self.active[r.index()]
    }

    /// Mutable access to the object at `r`.
    pub fn object_mut(&mut self, r: Ref) -> &mut Object {
        &mut self.active[r.index()]
    }

    /// Run a collection over the given roots.
    ///
    /// Every `Value` slot reachable through `roots` is rewritten to point
    /// into the new region; the old region is discarded. Returns a summary
    /// of the cycle.
    pub fn collect(&mut self, roots: &mut [&mut dyn Trace]) -> CollectSummary {
        let before = self.active.len();
        let grew = self.grow_next;
        let new_capacity = if grew { self.capacity * 2 } else { self.capacity };

        let from = std::mem::take(&mut self.active);
        let mut relocator = Relocator::new(from, new_capacity);
        for root in roots.iter_mut() {
            root.trace(&mut |slot| *slot = relocator.relocate(*slot));
        }

        let live = relocator.finish(&mut self.active);
        self.capacity = new_capacity;
        #[allow(clippy::cast_precision_loss)]
        {
            self.grow_next = (live as f64) > self.load_factor * (new_capacity as f64);
        }

        self.stats.collections += 1;
        self.stats.total_copied += live as u64;
        self.stats.live_slots = live;
        self.stats.capacity = new_capacity;

        let summary = CollectSummary {
            copied: live,
            discarded: before - live,
            capacity: new_capacity,
            grew,
        };
        tracing::debug!(
            copied = summary.copied,
            discarded = summary.discarded,
            capacity = summary.capacity,
            grew = summary.grew,
            grow_next = self.grow_next,
            "collection complete"
        );
        summary
    }

    // === Typed accessors ===
    //
    // Each returns `None` when the value is not of the expected shape; the
    // evaluator maps that to a TYPE error.

    /// Car and cdr of a cons-class value.
    pub fn as_cons(&self, v: Value) -> Option<(Value, Value)> {
        match &self.object(v.heap_ref()?).data {
            ObjData::Cons { car, cdr } => Some((*car, *cdr)),
            _ => None,
        }
    }

    /// The first slot of a cons cell.
    pub fn car(&self, v: Value) -> Option<Value> {
        if !v.is_pair() {
            return None;
        }
        Some(self.as_cons(v)?.0)
    }

    /// The second slot of a cons cell.
    pub fn cdr(&self, v: Value) -> Option<Value> {
        if !v.is_pair() {
            return None;
        }
        Some(self.as_cons(v)?.1)
    }

    /// Overwrite the first slot of a cons cell.
    pub fn set_car(&mut self, v: Value, new_car: Value) -> Option<()> {
        if !v.is_pair() {
            return None;
        }
        let obj = self.object_mut(v.heap_ref()?);
        match &mut obj.data {
            ObjData::Cons { car, .. } => {
                *car = new_car;
                Some(())
            }
            _ => None,
        }
    }

    /// Overwrite the second slot of a cons cell.
    ///
    /// Clears the cell's cached proper-list status: the new tail's
    /// termination is unknown.
    pub fn set_cdr(&mut self, v: Value, new_cdr: Value) -> Option<()> {
        if !v.is_pair() {
            return None;
        }
        let obj = self.object_mut(v.heap_ref()?);
        match &mut obj.data {
            ObjData::Cons { cdr, .. } => {
                *cdr = new_cdr;
                obj.header.clear_list_status();
                Some(())
            }
            _ => None,
        }
    }

    /// String payload of a string value.
    pub fn string(&self, v: Value) -> Option<&str> {
        match &self.object(v.heap_ref()?).data {
            ObjData::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Symbol payload of a symbol value.
    pub fn symbol(&self, v: Value) -> Option<&SymbolData> {
        match &self.object(v.heap_ref()?).data {
            ObjData::Symbol(sym) => Some(sym),
            _ => None,
        }
    }

    /// Table-node payload of a node value.
    pub fn node(&self, v: Value) -> Option<&NodeData> {
        match &self.object(v.heap_ref()?).data {
            ObjData::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Mutable table-node payload of a node value.
    pub fn node_mut(&mut self, v: Value) -> Option<&mut NodeData> {
        match &mut self.object_mut(v.heap_ref()?).data {
            ObjData::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Frame payload of a frame value.
    pub fn frame(&self, v: Value) -> Option<&FrameData> {
        match &self.object(v.heap_ref()?).data {
            ObjData::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    /// Mutable frame payload of a frame value.
    pub fn frame_mut(&mut self, v: Value) -> Option<&mut FrameData> {
        match &mut self.object_mut(v.heap_ref()?).data {
            ObjData::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    /// Procedure payload of a procedure value.
    pub fn procedure(&self, v: Value) -> Option<&ProcData> {
        match &self.object(v.heap_ref()?).data {
            ObjData::Procedure(proc) => Some(proc),
            _ => None,
        }
    }

    /// Whether `v` is a proper list: `Nil`, or a cons whose header still
    /// carries the construction-time proper-list status. O(1).
    pub fn is_proper_list(&self, v: Value) -> bool {
        if v.is_nil() {
            return true;
        }
        match v.heap_ref() {
            Some(r) if v.is_pair() => self.object(r).header.is_proper_list(),
            _ => false,
        }
    }

    /// Length of a list. O(1) for cells with a valid cached length; walks
    /// the spine otherwise. `None` when `v` is not a proper list.
    pub fn list_length(&self, v: Value) -> Option<u32> {
        if v.is_nil() {
            return Some(0);
        }
        if !v.is_pair() {
            return None;
        }
        if let Some(len) = self.object(v.heap_ref()?).header.cached_len() {
            return Some(len);
        }
        // Walk the spine; bail out on improper termination.
        let mut len: u32 = 0;
        let mut cursor = v;
        while cursor.is_pair() {
            len = len.checked_add(1)?;
            cursor = self.as_cons(cursor)?.1;
        }
        cursor.is_nil().then_some(len)
    }
}

impl ValueStore for Heap {
    fn object(&self, r: Ref) -> &Object {
        Heap::object(self, r)
    }
}
