//! Startup installation: special forms, core constants, type bindings,
//! constructors, and the core native set.
//!
//! Everything here goes through the public registration contract; the
//! wider standard library lives in the foreign-procedure layer and plugs
//! in the same way.

use crate::errors::{self, EvalResult};
use crate::machine::Machine;
use crate::native::{NativeCall, NativeDef};
use lyra_value::{SymbolFlags, TypeIdx, Value};

#[cfg(test)]
mod tests;

pub(crate) fn install(machine: &mut Machine) -> EvalResult<()> {
    install_special_forms(machine)?;
    install_constants(machine)?;
    install_type_bindings(machine)?;
    install_constructors(machine)?;
    install_natives(machine)?;
    Ok(())
}

/// Intern a reserved name and bind `value` to it in the global tree.
fn bind_constant(machine: &mut Machine, name: &'static str, value: Value) -> EvalResult {
    machine.push_root(value);
    let sym = machine.intern_flagged(name, SymbolFlags::CONSTANT)?;
    let value = machine.pop_root()?;
    let node = machine
        .symbol_node(sym)?
        .ok_or_else(|| errors::internal("constant symbol lacks a tree node"))?;
    machine.node_data_mut(node)?.binding = value;
    Ok(sym)
}

fn install_special_forms(machine: &mut Machine) -> EvalResult<()> {
    machine.special.quote = machine.intern_flagged("quote", SymbolFlags::CONSTANT)?;
    machine.special.setv = machine.intern_flagged("setv", SymbolFlags::CONSTANT)?;
    machine.special.def = machine.intern_flagged("def", SymbolFlags::CONSTANT)?;
    machine.special.do_ = machine.intern_flagged("do", SymbolFlags::CONSTANT)?;
    machine.special.let_ = machine.intern_flagged("let", SymbolFlags::CONSTANT)?;
    machine.special.if_ = machine.intern_flagged("if", SymbolFlags::CONSTANT)?;
    machine.special.fn_ = machine.intern_flagged("fn", SymbolFlags::CONSTANT)?;
    machine.special.macro_ = machine.intern_flagged("macro", SymbolFlags::CONSTANT)?;
    Ok(())
}

fn install_constants(machine: &mut Machine) -> EvalResult<()> {
    bind_constant(machine, "nil", Value::Nil)?;
    bind_constant(machine, "none", Value::None)?;
    // Truth constants bind to themselves.
    let t = machine.intern_flagged("t", SymbolFlags::CONSTANT)?;
    let node = machine
        .symbol_node(t)?
        .ok_or_else(|| errors::internal("constant symbol lacks a tree node"))?;
    machine.node_data_mut(node)?.binding = t;
    machine.consts.t = t;

    let ok = machine.intern_flagged("ok", SymbolFlags::CONSTANT)?;
    let node = machine
        .symbol_node(ok)?
        .ok_or_else(|| errors::internal("constant symbol lacks a tree node"))?;
    machine.node_data_mut(node)?.binding = ok;
    machine.consts.ok = ok;

    let error = machine.intern_flagged("error", SymbolFlags::CONSTANT)?;
    let node = machine
        .symbol_node(error)?
        .ok_or_else(|| errors::internal("constant symbol lacks a tree node"))?;
    machine.node_data_mut(node)?.binding = error;
    machine.consts.error = error;
    Ok(())
}

/// Bind the user-visible type names to their descriptors. Evaluating such
/// a name in operator position substitutes the registered constructor.
fn install_type_bindings(machine: &mut Machine) -> EvalResult<()> {
    const TYPES: [(&str, TypeIdx); 8] = [
        ("cons", TypeIdx::CONS),
        ("string", TypeIdx::STR),
        ("symbol", TypeIdx::SYMBOL),
        ("table", TypeIdx::TABLE),
        ("int", TypeIdx::INT),
        ("char", TypeIdx::CHAR),
        ("port", TypeIdx::PORT),
        ("type", TypeIdx::TYPE),
    ];
    for (name, idx) in TYPES {
        bind_constant(machine, name, Value::Type(idx))?;
    }
    Ok(())
}

fn install_constructors(machine: &mut Machine) -> EvalResult<()> {
    const CTORS: [(TypeIdx, NativeDef); 4] = [
        (
            TypeIdx::CONS,
            NativeDef {
                name: "cons",
                min_arity: 2,
                variadic: false,
                call: NativeCall::Two(native_cons),
            },
        ),
        (
            TypeIdx::STR,
            NativeDef {
                name: "string",
                min_arity: 0,
                variadic: true,
                call: NativeCall::Slice(native_str),
            },
        ),
        (
            TypeIdx::SYMBOL,
            NativeDef {
                name: "symbol",
                min_arity: 1,
                variadic: false,
                call: NativeCall::One(native_symbol_ctor),
            },
        ),
        (
            TypeIdx::TABLE,
            NativeDef {
                name: "table",
                min_arity: 0,
                variadic: false,
                call: NativeCall::Zero(native_table_ctor),
            },
        ),
    ];
    for (idx, def) in CTORS {
        let (proc, id) = machine.alloc_native_proc(def)?;
        machine.ctors[idx.raw() as usize] = proc;
        machine.registry.set_constructor(idx, id);
    }
    Ok(())
}

fn install_natives(machine: &mut Machine) -> EvalResult<()> {
    const NATIVES: [NativeDef; 19] = [
        NativeDef {
            name: "car",
            min_arity: 1,
            variadic: false,
            call: NativeCall::One(native_car),
        },
        NativeDef {
            name: "cdr",
            min_arity: 1,
            variadic: false,
            call: NativeCall::One(native_cdr),
        },
        NativeDef {
            name: "list",
            min_arity: 0,
            variadic: true,
            call: NativeCall::Slice(native_list),
        },
        NativeDef {
            name: "list?",
            min_arity: 1,
            variadic: false,
            call: NativeCall::One(native_is_list),
        },
        NativeDef {
            name: "len",
            min_arity: 1,
            variadic: false,
            call: NativeCall::One(native_len),
        },
        NativeDef {
            name: "eq",
            min_arity: 2,
            variadic: false,
            call: NativeCall::Two(native_eq),
        },
        NativeDef {
            name: "equal",
            min_arity: 2,
            variadic: false,
            call: NativeCall::Two(native_equal),
        },
        NativeDef {
            name: "not",
            min_arity: 1,
            variadic: false,
            call: NativeCall::One(native_not),
        },
        NativeDef {
            name: "+",
            min_arity: 2,
            variadic: false,
            call: NativeCall::Two(native_add),
        },
        NativeDef {
            name: "-",
            min_arity: 2,
            variadic: false,
            call: NativeCall::Two(native_sub),
        },
        NativeDef {
            name: "*",
            min_arity: 2,
            variadic: false,
            call: NativeCall::Two(native_mul),
        },
        NativeDef {
            name: "<",
            min_arity: 2,
            variadic: false,
            call: NativeCall::Two(native_lt),
        },
        NativeDef {
            name: "set-car",
            min_arity: 2,
            variadic: false,
            call: NativeCall::Two(native_set_car),
        },
        NativeDef {
            name: "set-cdr",
            min_arity: 2,
            variadic: false,
            call: NativeCall::Two(native_set_cdr),
        },
        NativeDef {
            name: "str",
            min_arity: 0,
            variadic: true,
            call: NativeCall::Slice(native_str),
        },
        NativeDef {
            name: "type-of",
            min_arity: 1,
            variadic: false,
            call: NativeCall::One(native_type_of),
        },
        NativeDef {
            name: "get",
            min_arity: 2,
            variadic: false,
            call: NativeCall::Two(native_table_get),
        },
        NativeDef {
            name: "put",
            min_arity: 3,
            variadic: false,
            call: NativeCall::Three(native_table_put),
        },
        NativeDef {
            name: "apply",
            min_arity: 2,
            variadic: false,
            call: NativeCall::Two(native_apply),
        },
    ];
    for def in NATIVES {
        machine.register_native(def)?;
    }
    Ok(())
}

// === Native implementations ===

fn native_cons(machine: &mut Machine, car: Value, cdr: Value) -> EvalResult {
    machine.cons(car, cdr)
}

fn native_car(machine: &mut Machine, v: Value) -> EvalResult {
    machine
        .heap
        .car(v)
        .ok_or_else(|| errors::type_mismatch("cons", machine.type_name_of(v)))
}

fn native_cdr(machine: &mut Machine, v: Value) -> EvalResult {
    machine
        .heap
        .cdr(v)
        .ok_or_else(|| errors::type_mismatch("cons", machine.type_name_of(v)))
}

fn native_list(machine: &mut Machine, args: &[Value]) -> EvalResult {
    machine.list_from_slice(args)
}

fn native_is_list(machine: &mut Machine, v: Value) -> EvalResult {
    Ok(machine.boolean(machine.heap.is_proper_list(v)))
}

fn native_len(machine: &mut Machine, v: Value) -> EvalResult {
    if let Some(n) = machine.heap.list_length(v) {
        return Ok(Value::Int(i64::from(n)));
    }
    if let Some(s) = machine.heap.string(v) {
        let n = s.chars().count();
        return Ok(Value::Int(n as i64));
    }
    Err(errors::type_mismatch(
        "list or string",
        machine.type_name_of(v),
    ))
}

fn native_eq(machine: &mut Machine, a: Value, b: Value) -> EvalResult {
    Ok(machine.boolean(a == b))
}

fn native_equal(machine: &mut Machine, a: Value, b: Value) -> EvalResult {
    Ok(machine.boolean(machine.structural_eq(a, b)))
}

fn native_not(machine: &mut Machine, v: Value) -> EvalResult {
    Ok(machine.boolean(v.is_nil()))
}

fn int_arg(machine: &Machine, v: Value) -> EvalResult<i64> {
    v.as_int()
        .ok_or_else(|| errors::type_mismatch("int", machine.type_name_of(v)))
}

fn native_add(machine: &mut Machine, a: Value, b: Value) -> EvalResult {
    let (a, b) = (int_arg(machine, a)?, int_arg(machine, b)?);
    a.checked_add(b)
        .map(Value::Int)
        .ok_or_else(|| errors::integer_overflow("+"))
}

fn native_sub(machine: &mut Machine, a: Value, b: Value) -> EvalResult {
    let (a, b) = (int_arg(machine, a)?, int_arg(machine, b)?);
    a.checked_sub(b)
        .map(Value::Int)
        .ok_or_else(|| errors::integer_overflow("-"))
}

fn native_mul(machine: &mut Machine, a: Value, b: Value) -> EvalResult {
    let (a, b) = (int_arg(machine, a)?, int_arg(machine, b)?);
    a.checked_mul(b)
        .map(Value::Int)
        .ok_or_else(|| errors::integer_overflow("*"))
}

fn native_lt(machine: &mut Machine, a: Value, b: Value) -> EvalResult {
    let (a, b) = (int_arg(machine, a)?, int_arg(machine, b)?);
    Ok(machine.boolean(a < b))
}

fn native_set_car(machine: &mut Machine, cell: Value, v: Value) -> EvalResult {
    machine
        .heap
        .set_car(cell, v)
        .ok_or_else(|| errors::type_mismatch("cons", machine.type_name_of(cell)))?;
    Ok(cell)
}

fn native_set_cdr(machine: &mut Machine, cell: Value, v: Value) -> EvalResult {
    machine
        .heap
        .set_cdr(cell, v)
        .ok_or_else(|| errors::type_mismatch("cons", machine.type_name_of(cell)))?;
    Ok(cell)
}

/// `str` renders and concatenates its arguments. String arguments are
/// appended raw; everything else renders `write`-style.
fn native_str(machine: &mut Machine, args: &[Value]) -> EvalResult {
    let mut out = String::new();
    for &arg in args {
        if let Some(s) = machine.heap.string(arg) {
            out.push_str(s);
        } else {
            out.push_str(&machine.display(arg));
        }
    }
    machine.alloc_string(&out)
}

fn native_type_of(machine: &mut Machine, v: Value) -> EvalResult {
    Ok(Value::Type(machine.registry.type_of(&machine.heap, v)))
}

fn native_symbol_ctor(machine: &mut Machine, v: Value) -> EvalResult {
    let Some(name) = machine.heap.string(v) else {
        return Err(errors::type_mismatch("string", machine.type_name_of(v)));
    };
    let name = name.to_string();
    machine.intern(&name)
}

fn native_table_ctor(machine: &mut Machine) -> EvalResult {
    machine.alloc_table()
}

fn native_table_get(machine: &mut Machine, table: Value, key: Value) -> EvalResult {
    Ok(machine.table_get(table, key)?.unwrap_or(Value::Nil))
}

fn native_table_put(machine: &mut Machine, table: Value, key: Value, value: Value) -> EvalResult {
    // The stored value is also the result; keep it current across the
    // insertion's possible collection.
    machine.push_root(value);
    let put = machine.table_put(table, key, value);
    let value = machine.pop_root()?;
    put?;
    Ok(value)
}

fn native_apply(machine: &mut Machine, f: Value, args: Value) -> EvalResult {
    machine.apply(f, args)
}
