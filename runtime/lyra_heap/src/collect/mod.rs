//! The copying collector.
//!
//! One [`Relocator`] exists per collection cycle. It owns the old region,
//! fills the new one, and maintains the relocation map. Relocating a value:
//!
//! 1. Immediates pass through unchanged.
//! 2. A pointer whose old slot already forwarded resolves to the recorded
//!    new index.
//! 3. Otherwise the new slot and the map entry are claimed *first* — this
//!    is what terminates cycles — the object is moved out of the old slot
//!    (leaving a `Moved` tombstone), its children are relocated
//!    recursively, and it is stored at the claimed slot.
//!
//! Procedure bodies are traced only for interpreted procedures; a native
//! body is an index into the machine's callable table, which is not heap
//! data. Type descriptors are immediates and are never traced.

use lyra_stack::ensure_sufficient_stack;
use lyra_value::{ObjData, Object, ProcBody, Ref, Value};


/// Sentinel in the relocation map: slot not yet forwarded.
const NO_FORWARD: u32 = u32::MAX;

/// Result of one collection cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollectSummary {
    /// Slots copied into the new region (the live set).
    pub copied: usize,
    /// Slots left behind and discarded.
    pub discarded: usize,
    /// Capacity of the new region.
    pub capacity: usize,
    /// Whether this cycle grew the region.
    pub grew: bool,
}

/// State of an in-progress collection.
pub(crate) struct Relocator {
    /// The old region. Evacuated slots hold `Moved` tombstones.
    from: Vec<Object>,
    /// The new region, filled in traversal order.
    to: Vec<Object>,
    /// Old index → new index, `NO_FORWARD` when not yet relocated.
    forward: Vec<u32>,
}

impl Relocator {
    pub(crate) fn new(from: Vec<Object>, new_capacity: usize) -> Self {
        let old_len = from.len();
        Relocator {
            from,
            to: Vec::with_capacity(old_len.min(new_capacity)),
            forward: vec![NO_FORWARD; old_len],
        }
    }

    /// Relocate one value, copying its object (and transitively its
    /// children) into the new region on first visit.
    pub(crate) fn relocate(&mut self, value: Value) -> Value {
        let Some(r) = value.heap_ref() else {
            return value;
        };
        let old = r.index();
        let fwd = self.forward[old];
        if fwd != NO_FORWARD {
            return value.with_ref(Ref::from_raw(fwd));
        }
        ensure_sufficient_stack(|| {
            let new = self.to.len() as u32;
            self.forward[old] = new;
            let mut object =
                std::mem::replace(&mut self.from[old], Object::moved(Ref::from_raw(new)));
            // Claim the slot before tracing children so cycles terminate.
            self.to.push(Object::moved(Ref::from_raw(new)));
            self.relocate_children(&mut object);
            self.to[new as usize] = object;
            value.with_ref(Ref::from_raw(new))
        })
    }

    fn relocate_children(&mut self, object: &mut Object) {
        match &mut object.data {
            ObjData::Cons { car, cdr } => {
                *car = self.relocate(*car);
                *cdr = self.relocate(*cdr);
            }
            ObjData::Node(node) => {
                node.key = self.relocate(node.key);
                node.binding = self.relocate(node.binding);
                node.left = self.relocate(node.left);
                node.right = self.relocate(node.right);
            }
            ObjData::Frame(frame) => {
                frame.parent = self.relocate(frame.parent);
                for name in &mut frame.names {
                    *name = self.relocate(*name);
                }
                for value in &mut frame.values {
                    *value = self.relocate(*value);
                }
            }
            ObjData::Procedure(proc) => {
                proc.params = self.relocate(proc.params);
                proc.env = self.relocate(proc.env);
                if let ProcBody::Exprs(body) = proc.body {
                    proc.body = ProcBody::Exprs(self.relocate(body));
                }
            }
            // Leaf payloads own no value slots.
            ObjData::Str(_) | ObjData::Symbol(_) | ObjData::Port(_) => {}
            // A tombstone is only ever written over an evacuated slot,
            // and evacuated slots forward before they are revisited.
            ObjData::Moved(_) => {
                debug_assert!(false, "tombstone reached through a live reference");
            }
        }
    }

    /// Install the new region and return the live count.
    pub(crate) fn finish(self, active: &mut Vec<Object>) -> usize {
        let live = self.to.len();
        *active = self.to;
        live
    }
}
