use super::*;
use crate::object::{Object, SymbolFlags};
use crate::value::Ref;
use pretty_assertions::assert_eq;

struct OneObject(Object);

impl ValueStore for OneObject {
    fn object(&self, _r: Ref) -> &Object {
        &self.0
    }
}

#[test]
fn builtin_indices_are_fixed() {
    let registry = TypeRegistry::with_builtins();
    assert_eq!(registry.len(), TypeIdx::BUILTIN_COUNT as usize);
    assert_eq!(registry.type_name(TypeIdx::NIL), "nil");
    assert_eq!(registry.type_name(TypeIdx::CONS), "cons");
    assert_eq!(registry.type_name(TypeIdx::NONE), "none");
    assert_eq!(registry.type_name(TypeIdx::STR), "string");
    assert_eq!(registry.type_name(TypeIdx::TYPE), "type");
    assert_eq!(registry.type_name(TypeIdx::SYMBOL), "symbol");
    assert_eq!(registry.type_name(TypeIdx::TABLE), "table");
    assert_eq!(registry.type_name(TypeIdx::PROCEDURE), "fn");
    assert_eq!(registry.type_name(TypeIdx::PORT), "port");
    assert_eq!(registry.type_name(TypeIdx::INT), "int");
    assert_eq!(registry.type_name(TypeIdx::CHAR), "char");
    assert_eq!(registry.type_name(TypeIdx::FRAME), "frame");
}

#[test]
fn lookup_by_name_round_trips() {
    let registry = TypeRegistry::with_builtins();
    assert_eq!(registry.lookup("cons"), Some(TypeIdx::CONS));
    assert_eq!(registry.lookup("no-such-type"), None);
}

#[test]
fn type_of_immediates_is_tag_determined() {
    let registry = TypeRegistry::with_builtins();
    let store = OneObject(Object::string("unused"));
    assert_eq!(registry.type_of(&store, Value::Nil), TypeIdx::NIL);
    assert_eq!(registry.type_of(&store, Value::Int(1)), TypeIdx::INT);
    assert_eq!(registry.type_of(&store, Value::Char('x')), TypeIdx::CHAR);
    assert_eq!(registry.type_of(&store, Value::None), TypeIdx::NONE);
    assert_eq!(
        registry.type_of(&store, Value::Type(TypeIdx::INT)),
        TypeIdx::TYPE
    );
}

#[test]
fn type_of_generic_pointer_reads_header() {
    let registry = TypeRegistry::with_builtins();
    let store = OneObject(Object::symbol("x", 1, SymbolFlags::empty()));
    assert_eq!(
        registry.type_of(&store, Value::Obj(Ref::from_raw(0))),
        TypeIdx::SYMBOL
    );
}

#[test]
fn registration_grows_monotonically() {
    let mut registry = TypeRegistry::with_builtins();
    let idx = registry
        .register(TypeDescriptor {
            name: "widget".to_string(),
            tag: crate::value::Tag::Obj,
            print: crate::print::print_table,
            compare: None,
            constructor: None,
        })
        .expect("registration below the maximum succeeds");
    assert_eq!(idx.raw(), TypeIdx::BUILTIN_COUNT);
    assert!(!idx.is_builtin());
    assert_eq!(registry.lookup("widget"), Some(idx));
}

#[test]
fn registration_overflow_is_reported() {
    let mut registry = TypeRegistry::with_builtins();
    let mut last = Ok(TypeIdx::NIL);
    for i in registry.len()..=TypeIdx::MAX_TYPES {
        last = registry.register(TypeDescriptor {
            name: format!("t{i}"),
            tag: crate::value::Tag::Obj,
            print: crate::print::print_table,
            compare: None,
            constructor: None,
        });
    }
    assert_eq!(
        last,
        Err(RegistryError::Overflow {
            count: TypeIdx::MAX_TYPES,
            max: TypeIdx::MAX_TYPES,
        })
    );
}
