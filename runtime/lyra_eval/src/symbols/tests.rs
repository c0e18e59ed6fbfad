use crate::machine::Machine;
use lyra_value::Value;
use pretty_assertions::assert_eq;

fn machine() -> Machine {
    Machine::new().expect("machine construction")
}

#[test]
fn intern_is_idempotent() {
    let mut m = machine();
    let a = m.intern("widget").expect("intern");
    let b = m.intern("widget").expect("intern");
    assert_eq!(a, b, "equal names intern to the identical symbol");
}

#[test]
fn distinct_names_intern_distinctly() {
    let mut m = machine();
    let a = m.intern("a").expect("intern");
    let b = m.intern("b").expect("intern");
    assert_ne!(a, b);
    assert_eq!(m.symbol_name(a), "a");
    assert_eq!(m.symbol_name(b), "b");
}

#[test]
fn uninterned_symbols_are_fresh_identities() {
    let mut m = machine();
    let a = m.uninterned_symbol("g1").expect("symbol");
    let b = m.uninterned_symbol("g1").expect("symbol");
    let interned = m.intern("g1").expect("intern");
    assert_ne!(a, b);
    assert_ne!(a, interned);
    assert!(!m.symbol_data(a).expect("symbol data").flags.contains(
        lyra_value::SymbolFlags::INTERNED
    ));
}

#[test]
fn many_symbols_stay_findable() {
    let mut m = machine();
    let mut first_pass = Vec::new();
    for i in 0..300 {
        let name = format!("sym-{i}");
        // Values may be relocated by later interning; remember names only.
        m.intern(&name).expect("intern");
        first_pass.push(name);
    }
    for name in &first_pass {
        let sym = m.intern(name).expect("re-intern");
        assert_eq!(m.symbol_name(sym), *name);
    }
}

#[test]
fn tree_stays_balanced() {
    let mut m = machine();
    for i in 0..255 {
        m.intern(&format!("balanced-{i}")).expect("intern");
    }
    // Startup interns a few dozen names; 255 more keeps the total under
    // 512, whose AVL height bound is comfortably under 14.
    let root = m.globals;
    let height = m.node_data(root).expect("root node").height;
    assert!(height <= 14, "AVL height {height} exceeds the expected bound");
}

#[test]
fn constant_flag_is_preserved() {
    let mut m = machine();
    let t = m.intern("t").expect("intern");
    assert!(m.symbol_data(t).expect("symbol data").is_constant());
    let user = m.intern("user-name").expect("intern");
    assert!(!m.symbol_data(user).expect("symbol data").is_constant());
}

#[test]
fn symbol_node_carries_the_binding() {
    let mut m = machine();
    let t = m.intern("t").expect("intern");
    let node = m.symbol_node(t).expect("lookup").expect("node exists");
    let binding = m.node_data(node).expect("node data").binding;
    assert_eq!(binding, t, "t is bound to itself");
}

#[test]
fn table_put_get_round_trips() {
    let mut m = machine();
    let table = m.alloc_table().expect("table");
    let k = m.intern("key-a").expect("intern");
    m.table_put(table, k, Value::Int(1)).expect("put");
    assert_eq!(m.table_get(table, k).expect("get"), Some(Value::Int(1)));
}

#[test]
fn table_get_of_missing_key_is_none() {
    let mut m = machine();
    let table = m.alloc_table().expect("table");
    let k = m.intern("missing").expect("intern");
    assert_eq!(m.table_get(table, k).expect("get"), None);
}

#[test]
fn table_put_overwrites_in_place() {
    let mut m = machine();
    let table = m.alloc_table().expect("table");
    let k = m.intern("key-b").expect("intern");
    m.table_put(table, k, Value::Int(1)).expect("put");
    m.table_put(table, k, Value::Int(2)).expect("put");
    assert_eq!(m.table_get(table, k).expect("get"), Some(Value::Int(2)));
}

#[test]
fn tables_hold_many_keys() {
    let mut m = machine();
    // Pre-intern so later sym lookups never allocate while `table` is
    // held in a host local.
    for i in 0..64 {
        m.intern(&format!("tk-{i}")).expect("intern");
    }
    let table = m.alloc_table().expect("table");
    m.push_root(table);
    for i in 0..64 {
        let table = m.scratch[m.scratch.len() - 1];
        let k = m.intern(&format!("tk-{i}")).expect("intern");
        m.table_put(table, k, Value::Int(i)).expect("put");
    }
    let table = m.pop_root().expect("root");
    for i in 0..64 {
        let k = m.intern(&format!("tk-{i}")).expect("intern");
        assert_eq!(m.table_get(table, k).expect("get"), Some(Value::Int(i)));
    }
}

#[test]
fn tables_are_separate_from_the_global_namespace() {
    let mut m = machine();
    let table = m.alloc_table().expect("table");
    let k = m.intern("separate").expect("intern");
    m.table_put(table, k, Value::Int(5)).expect("put");
    // The symbol stays globally unbound.
    let err = m.lookup_value(k, Value::Nil).expect_err("unbound globally");
    assert_eq!(err.code, lyra_diagnostic::ErrorCode::Unbound);
}

#[test]
fn table_ops_reject_wrong_types() {
    let mut m = machine();
    let table = m.alloc_table().expect("table");
    let k = m.intern("k").expect("intern");
    let err = m.table_get(Value::Int(1), k).expect_err("not a table");
    assert_eq!(err.code, lyra_diagnostic::ErrorCode::Type);
    let err = m
        .table_put(table, Value::Int(1), Value::Nil)
        .expect_err("keys are symbols");
    assert_eq!(err.code, lyra_diagnostic::ErrorCode::Type);
}

#[test]
fn interning_survives_collection() {
    let mut m = machine();
    m.intern("stable").expect("intern");
    m.collect_now();
    let after = m.intern("stable").expect("re-intern");
    assert_eq!(m.symbol_name(after), "stable");
    // Still bound through the tree: nil resolves to the empty list.
    let nil_sym = m.intern("nil").expect("intern");
    let node = m.symbol_node(nil_sym).expect("lookup").expect("node");
    assert_eq!(m.node_data(node).expect("node data").binding, Value::Nil);
}
