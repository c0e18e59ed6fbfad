//! The root-set seam.

use lyra_value::Value;

/// Exposes a structure's `Value` slots to the collector.
///
/// The collector calls `trace` with a visitor that rewrites each slot in
/// place (relocating whatever the slot points at). Implementations must
/// present every slot that can hold a live reference — a missed slot is a
/// dangling ref after the next collection.
pub trait Trace {
    /// Visit every `Value` slot owned by `self`.
    fn trace(&mut self, visit: &mut dyn FnMut(&mut Value));
}

impl Trace for Value {
    fn trace(&mut self, visit: &mut dyn FnMut(&mut Value)) {
        visit(self);
    }
}

impl<T: Trace> Trace for Vec<T> {
    fn trace(&mut self, visit: &mut dyn FnMut(&mut Value)) {
        for item in self {
            item.trace(visit);
        }
    }
}

impl<T: Trace> Trace for [T] {
    fn trace(&mut self, visit: &mut dyn FnMut(&mut Value)) {
        for item in self {
            item.trace(visit);
        }
    }
}

impl<T: Trace> Trace for Option<T> {
    fn trace(&mut self, visit: &mut dyn FnMut(&mut Value)) {
        if let Some(item) = self {
            item.trace(visit);
        }
    }
}
