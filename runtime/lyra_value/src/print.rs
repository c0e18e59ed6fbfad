//! Default printers, dispatched through the type registry.
//!
//! Rendering is `write`-style: strings are quoted and escaped, characters
//! use the `#\x` notation, opaque objects print as `#<...>`. The embedding
//! REPL and the `str` builtin both go through [`display_value`].

use crate::object::ObjData;
use crate::registry::TypeRegistry;
use crate::store::ValueStore;
use crate::value::Value;
use std::fmt::{self, Write};

/// Nesting budget for the printer. Deeper structure renders as `...`.
pub const MAX_PRINT_DEPTH: usize = 128;

/// Chain budget for a single list spine, guarding against cyclic tails.
const MAX_PRINT_CHAIN: usize = 4096;

/// Render `value` to a fresh string.
pub fn display_value(registry: &TypeRegistry, store: &dyn ValueStore, value: Value) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_value(registry, store, value, MAX_PRINT_DEPTH, &mut out);
    out
}

/// Render `value` into `out`, dispatching through the registry.
pub fn write_value(
    registry: &TypeRegistry,
    store: &dyn ValueStore,
    value: Value,
    depth: usize,
    out: &mut String,
) -> fmt::Result {
    if depth == 0 {
        return out.write_str("...");
    }
    let idx = registry.type_of(store, value);
    (registry.descriptor(idx).print)(registry, store, value, depth - 1, out)
}

pub(crate) fn print_nil(
    _registry: &TypeRegistry,
    _store: &dyn ValueStore,
    _value: Value,
    _depth: usize,
    out: &mut String,
) -> fmt::Result {
    out.write_str("()")
}

pub(crate) fn print_none(
    _registry: &TypeRegistry,
    _store: &dyn ValueStore,
    _value: Value,
    _depth: usize,
    out: &mut String,
) -> fmt::Result {
    out.write_str("none")
}

pub(crate) fn print_int(
    _registry: &TypeRegistry,
    _store: &dyn ValueStore,
    value: Value,
    _depth: usize,
    out: &mut String,
) -> fmt::Result {
    match value {
        Value::Int(i) => write!(out, "{i}"),
        _ => out.write_str("#<int?>"),
    }
}

pub(crate) fn print_char(
    _registry: &TypeRegistry,
    _store: &dyn ValueStore,
    value: Value,
    _depth: usize,
    out: &mut String,
) -> fmt::Result {
    match value {
        Value::Char('\n') => out.write_str("#\\newline"),
        Value::Char('\t') => out.write_str("#\\tab"),
        Value::Char(' ') => out.write_str("#\\space"),
        Value::Char(c) => write!(out, "#\\{c}"),
        _ => out.write_str("#<char?>"),
    }
}

pub(crate) fn print_str(
    _registry: &TypeRegistry,
    store: &dyn ValueStore,
    value: Value,
    _depth: usize,
    out: &mut String,
) -> fmt::Result {
    match value.heap_ref().map(|r| &store.object(r).data) {
        Some(ObjData::Str(s)) => write!(out, "{s:?}"),
        _ => out.write_str("#<string?>"),
    }
}

pub(crate) fn print_symbol(
    _registry: &TypeRegistry,
    store: &dyn ValueStore,
    value: Value,
    _depth: usize,
    out: &mut String,
) -> fmt::Result {
    match value.heap_ref().map(|r| &store.object(r).data) {
        Some(ObjData::Symbol(sym)) => out.write_str(&sym.name),
        _ => out.write_str("#<symbol?>"),
    }
}

pub(crate) fn print_type(
    registry: &TypeRegistry,
    _store: &dyn ValueStore,
    value: Value,
    _depth: usize,
    out: &mut String,
) -> fmt::Result {
    match value {
        Value::Type(idx) if registry.get(idx).is_some() => {
            write!(out, "#<type {}>", registry.type_name(idx))
        }
        _ => out.write_str("#<type?>"),
    }
}

pub(crate) fn print_cons(
    registry: &TypeRegistry,
    store: &dyn ValueStore,
    value: Value,
    depth: usize,
    out: &mut String,
) -> fmt::Result {
    out.write_char('(')?;
    let mut cursor = value;
    let mut budget = MAX_PRINT_CHAIN;
    let mut first = true;
    loop {
        let Some((car, cdr)) = cons_fields(store, cursor) else {
            // Improper tail.
            out.write_str(" . ")?;
            write_value(registry, store, cursor, depth, out)?;
            break;
        };
        if !first {
            out.write_char(' ')?;
        }
        first = false;
        write_value(registry, store, car, depth, out)?;
        if cdr.is_nil() {
            break;
        }
        if budget == 0 {
            out.write_str(" ...")?;
            break;
        }
        budget -= 1;
        cursor = cdr;
    }
    out.write_char(')')
}

pub(crate) fn print_table(
    _registry: &TypeRegistry,
    _store: &dyn ValueStore,
    _value: Value,
    _depth: usize,
    out: &mut String,
) -> fmt::Result {
    out.write_str("#<table>")
}

pub(crate) fn print_procedure(
    _registry: &TypeRegistry,
    store: &dyn ValueStore,
    value: Value,
    _depth: usize,
    out: &mut String,
) -> fmt::Result {
    match value.heap_ref().map(|r| &store.object(r).data) {
        Some(ObjData::Procedure(p)) if p.is_macro() => out.write_str("#<macro>"),
        Some(ObjData::Procedure(p)) if p.is_native() => out.write_str("#<builtin>"),
        Some(ObjData::Procedure(_)) => out.write_str("#<fn>"),
        _ => out.write_str("#<fn?>"),
    }
}

pub(crate) fn print_port(
    _registry: &TypeRegistry,
    store: &dyn ValueStore,
    value: Value,
    _depth: usize,
    out: &mut String,
) -> fmt::Result {
    match value.heap_ref().map(|r| &store.object(r).data) {
        Some(ObjData::Port(p)) => write!(out, "#<port {}>", p.name),
        _ => out.write_str("#<port?>"),
    }
}

pub(crate) fn print_frame(
    _registry: &TypeRegistry,
    _store: &dyn ValueStore,
    _value: Value,
    _depth: usize,
    out: &mut String,
) -> fmt::Result {
    out.write_str("#<frame>")
}

/// Car/cdr of a cons-class value, through the store.
pub(crate) fn cons_fields(store: &dyn ValueStore, value: Value) -> Option<(Value, Value)> {
    let r = match value {
        Value::Cons(r) | Value::List(r) => r,
        _ => return None,
    };
    match &store.object(r).data {
        ObjData::Cons { car, cdr } => Some((*car, *cdr)),
        _ => None,
    }
}
