use crate::machine::Machine;
use lyra_diagnostic::ErrorCode;
use lyra_value::{TypeIdx, Value};
use pretty_assertions::assert_eq;

fn machine() -> Machine {
    Machine::new().expect("machine construction")
}

/// Evaluate `(op args...)` with `op` looked up globally.
fn call(m: &mut Machine, op: &str, args: &[Value]) -> crate::EvalResult {
    let sym = m.intern(op).expect("intern");
    let f = m.lookup_value(sym, Value::Nil).expect("operator bound");
    m.push_root(f);
    let args = m.list_from_slice(args).expect("args");
    let f = m.pop_root().expect("root");
    m.apply(f, args)
}

#[test]
fn arithmetic_natives_compute() {
    let mut m = machine();
    assert_eq!(call(&mut m, "+", &[Value::Int(1), Value::Int(2)]), Ok(Value::Int(3)));
    assert_eq!(call(&mut m, "-", &[Value::Int(5), Value::Int(2)]), Ok(Value::Int(3)));
    assert_eq!(call(&mut m, "*", &[Value::Int(4), Value::Int(3)]), Ok(Value::Int(12)));
}

#[test]
fn arithmetic_rejects_non_ints() {
    let mut m = machine();
    let s = m.alloc_string("x").expect("string");
    let err = call(&mut m, "+", &[s, Value::Int(1)]).expect_err("strings do not add");
    assert_eq!(err.code, ErrorCode::Type);
}

#[test]
fn arithmetic_overflow_is_a_value_error() {
    let mut m = machine();
    let err = call(&mut m, "+", &[Value::Int(i64::MAX), Value::Int(1)])
        .expect_err("overflow");
    assert_eq!(err.code, ErrorCode::Value);
}

#[test]
fn comparison_returns_t_or_nil() {
    let mut m = machine();
    let t = m.truth();
    assert_eq!(call(&mut m, "<", &[Value::Int(1), Value::Int(2)]), Ok(t));
    assert_eq!(call(&mut m, "<", &[Value::Int(2), Value::Int(1)]), Ok(Value::Nil));
}

#[test]
fn eq_is_identity_equal_is_structural() {
    let mut m = machine();
    let a = m.list_from_slice(&[Value::Int(1)]).expect("list");
    m.push_root(a);
    let b = m.list_from_slice(&[Value::Int(1)]).expect("list");
    let a = m.pop_root().expect("root");

    let t = m.truth();
    assert_eq!(call(&mut m, "eq", &[a, a]), Ok(t));
    assert_eq!(call(&mut m, "eq", &[a, b]), Ok(Value::Nil));
    assert_eq!(call(&mut m, "equal", &[a, b]), Ok(t));
}

#[test]
fn len_counts_lists_and_strings() {
    let mut m = machine();
    let list = m
        .list_from_slice(&[Value::Int(1), Value::Int(2), Value::Int(3)])
        .expect("list");
    assert_eq!(call(&mut m, "len", &[list]), Ok(Value::Int(3)));
    let s = m.alloc_string("hello").expect("string");
    assert_eq!(call(&mut m, "len", &[s]), Ok(Value::Int(5)));
    assert_eq!(call(&mut m, "len", &[Value::Nil]), Ok(Value::Int(0)));
}

#[test]
fn str_concatenates_raw_strings_and_rendered_values() {
    let mut m = machine();
    let s = m.alloc_string("n=").expect("string");
    let result = call(&mut m, "str", &[s, Value::Int(42)]).expect("str");
    assert_eq!(m.heap().string(result), Some("n=42"));
}

#[test]
fn type_of_returns_descriptors() {
    let mut m = machine();
    assert_eq!(call(&mut m, "type-of", &[Value::Int(1)]), Ok(Value::Type(TypeIdx::INT)));
    assert_eq!(call(&mut m, "type-of", &[Value::Nil]), Ok(Value::Type(TypeIdx::NIL)));
    let sym = m.intern("zed").expect("intern");
    assert_eq!(call(&mut m, "type-of", &[sym]), Ok(Value::Type(TypeIdx::SYMBOL)));
}

#[test]
fn set_cdr_invalidates_list_status() {
    let mut m = machine();
    let list = m
        .list_from_slice(&[Value::Int(1), Value::Int(2)])
        .expect("list");
    m.push_root(list);
    let t = m.truth();
    assert_eq!(call(&mut m, "list?", &[list]), Ok(t));
    call(&mut m, "set-cdr", &[list, Value::Int(9)]).expect("set-cdr");
    let list = m.pop_root().expect("root");
    assert_eq!(call(&mut m, "list?", &[list]), Ok(Value::Nil));
}

#[test]
fn symbol_constructor_interns() {
    let mut m = machine();
    let name = m.alloc_string("fresh").expect("string");
    let via_ctor = call(&mut m, "symbol", &[name]).expect("ctor");
    let via_intern = m.intern("fresh").expect("intern");
    assert_eq!(via_ctor, via_intern);
}

#[test]
fn table_constructor_allocates_a_table() {
    let mut m = machine();
    let table = call(&mut m, "table", &[]).expect("ctor");
    assert_eq!(
        m.registry().type_of(m.heap(), table),
        TypeIdx::TABLE
    );
}

#[test]
fn table_get_and_put_natives_round_trip() {
    let mut m = machine();
    let table = call(&mut m, "table", &[]).expect("ctor");
    m.push_root(table);
    let k = m.intern("slot").expect("intern");
    let table = m.pop_root().expect("root");

    let stored = call(&mut m, "put", &[table, k, Value::Int(7)]).expect("put");
    assert_eq!(stored, Value::Int(7));
    assert_eq!(call(&mut m, "get", &[table, k]), Ok(Value::Int(7)));

    // Missing keys read as nil.
    m.push_root(table);
    let other = m.intern("other-slot").expect("intern");
    let table = m.pop_root().expect("root");
    assert_eq!(call(&mut m, "get", &[table, other]), Ok(Value::Nil));
}

#[test]
fn apply_native_applies() {
    let mut m = machine();
    let plus_sym = m.intern("+").expect("intern");
    let plus = m.lookup_value(plus_sym, Value::Nil).expect("bound");
    m.push_root(plus);
    let args = m
        .list_from_slice(&[Value::Int(20), Value::Int(22)])
        .expect("args");
    let plus = m.pop_root().expect("root");
    assert_eq!(call(&mut m, "apply", &[plus, args]), Ok(Value::Int(42)));
}
