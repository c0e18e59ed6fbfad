//! Structural comparison, dispatched through the type registry.
//!
//! Raw `==` on [`Value`] is identity. These functions implement the
//! structural layer: values of the same type are compared by their type's
//! comparator; values of different types (or of identity-only types) are
//! incomparable.

use crate::object::ObjData;
use crate::print::cons_fields;
use crate::registry::TypeRegistry;
use crate::store::ValueStore;
use crate::value::Value;
use lyra_stack::ensure_sufficient_stack;
use std::cmp::Ordering;

/// Structural ordering of `a` and `b`, or `None` when incomparable.
pub fn structural_compare(
    registry: &TypeRegistry,
    store: &dyn ValueStore,
    a: Value,
    b: Value,
) -> Option<Ordering> {
    if a == b {
        return Some(Ordering::Equal);
    }
    let ta = registry.type_of(store, a);
    let tb = registry.type_of(store, b);
    if ta != tb {
        return None;
    }
    let cmp = registry.descriptor(ta).compare?;
    cmp(registry, store, a, b)
}

/// Structural equality of `a` and `b`.
pub fn structural_eq(registry: &TypeRegistry, store: &dyn ValueStore, a: Value, b: Value) -> bool {
    structural_compare(registry, store, a, b) == Some(Ordering::Equal)
}

/// Comparator for identity-only types. Identical values were already
/// handled by the dispatcher, so reaching this means the values differ.
pub(crate) fn compare_identity(
    _registry: &TypeRegistry,
    _store: &dyn ValueStore,
    _a: Value,
    _b: Value,
) -> Option<Ordering> {
    None
}

pub(crate) fn compare_int(
    _registry: &TypeRegistry,
    _store: &dyn ValueStore,
    a: Value,
    b: Value,
) -> Option<Ordering> {
    Some(a.as_int()?.cmp(&b.as_int()?))
}

pub(crate) fn compare_char(
    _registry: &TypeRegistry,
    _store: &dyn ValueStore,
    a: Value,
    b: Value,
) -> Option<Ordering> {
    Some(a.as_char()?.cmp(&b.as_char()?))
}

pub(crate) fn compare_str(
    _registry: &TypeRegistry,
    store: &dyn ValueStore,
    a: Value,
    b: Value,
) -> Option<Ordering> {
    Some(str_payload(store, a)?.cmp(str_payload(store, b)?))
}

/// Symbols order lexicographically by name. Interned symbols of equal name
/// are identical and never reach this; uninterned symbols compare by name
/// alone.
pub(crate) fn compare_symbol(
    _registry: &TypeRegistry,
    store: &dyn ValueStore,
    a: Value,
    b: Value,
) -> Option<Ordering> {
    Some(symbol_name(store, a)?.cmp(symbol_name(store, b)?))
}

/// Cons cells compare lexicographically: car first, then cdr. Recursion is
/// bounded by the structure's depth.
pub(crate) fn compare_cons(
    registry: &TypeRegistry,
    store: &dyn ValueStore,
    a: Value,
    b: Value,
) -> Option<Ordering> {
    ensure_sufficient_stack(|| {
        let (car_a, cdr_a) = cons_fields(store, a)?;
        let (car_b, cdr_b) = cons_fields(store, b)?;
        match structural_compare(registry, store, car_a, car_b)? {
            Ordering::Equal => structural_compare(registry, store, cdr_a, cdr_b),
            other => Some(other),
        }
    })
}

fn str_payload(store: &dyn ValueStore, v: Value) -> Option<&str> {
    match &store.object(v.heap_ref()?).data {
        ObjData::Str(s) => Some(s),
        _ => None,
    }
}

fn symbol_name(store: &dyn ValueStore, v: Value) -> Option<&str> {
    match &store.object(v.heap_ref()?).data {
        ObjData::Symbol(sym) => Some(&sym.name),
        _ => None,
    }
}
