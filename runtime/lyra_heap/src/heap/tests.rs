use super::*;
use pretty_assertions::assert_eq;

fn small_heap() -> Heap {
    Heap::new(HeapConfig {
        initial_capacity: 64,
        load_factor: 0.75,
    })
}

/// Build a proper list of ints, maintaining the cached length by hand the
/// way the machine's cons constructor does.
fn alloc_list(heap: &mut Heap, items: &[i64]) -> Value {
    let mut tail = Value::Nil;
    let mut len: u32 = 0;
    for &item in items.iter().rev() {
        len += 1;
        let r = heap
            .alloc(Object::list_cons(Value::Int(item), tail, len))
            .expect("list fits in region");
        tail = Value::List(r);
    }
    tail
}

#[test]
fn alloc_fills_the_region() {
    let mut heap = small_heap();
    assert_eq!(heap.free_slots(), 64);
    let r = heap.alloc(Object::cons(Value::Int(1), Value::Nil)).expect("room");
    assert_eq!(heap.free_slots(), 63);
    assert_eq!(heap.as_cons(Value::Cons(r)), Some((Value::Int(1), Value::Nil)));
}

#[test]
fn alloc_at_capacity_reports_region_full() {
    let mut heap = small_heap();
    for i in 0..64 {
        heap.alloc(Object::cons(Value::Int(i), Value::Nil))
            .expect("filling the region");
    }
    assert_eq!(
        heap.alloc(Object::cons(Value::Nil, Value::Nil)),
        Err(HeapError::RegionFull { capacity: 64 })
    );
}

#[test]
fn car_cdr_reject_non_pairs() {
    let mut heap = small_heap();
    let s = heap.alloc(Object::string("hi")).expect("room");
    assert_eq!(heap.car(Value::Str(s)), None);
    assert_eq!(heap.cdr(Value::Int(1)), None);
    assert_eq!(heap.string(Value::Str(s)), Some("hi"));
}

#[test]
fn list_length_uses_the_cache() {
    let mut heap = small_heap();
    let list = alloc_list(&mut heap, &[1, 2, 3, 4]);
    assert!(heap.is_proper_list(list));
    assert_eq!(heap.list_length(list), Some(4));
    assert_eq!(heap.list_length(Value::Nil), Some(0));
}

#[test]
fn list_length_walks_uncached_spines() {
    let mut heap = small_heap();
    // Built innermost-first with plain conses: no cached length anywhere.
    let inner = heap.alloc(Object::cons(Value::Int(2), Value::Nil)).expect("room");
    let outer = heap
        .alloc(Object::cons(Value::Int(1), Value::Cons(inner)))
        .expect("room");
    let list = Value::Cons(outer);
    assert!(!heap.is_proper_list(list));
    assert_eq!(heap.list_length(list), Some(2));
}

#[test]
fn set_cdr_clears_proper_list_status() {
    let mut heap = small_heap();
    let list = alloc_list(&mut heap, &[1, 2, 3]);
    assert!(heap.is_proper_list(list));

    heap.set_cdr(list, Value::Int(9)).expect("cons cell");
    assert!(!heap.is_proper_list(list));
    assert_eq!(heap.list_length(list), None);
    assert_eq!(heap.cdr(list), Some(Value::Int(9)));
}

#[test]
fn set_car_keeps_list_status() {
    let mut heap = small_heap();
    let list = alloc_list(&mut heap, &[1, 2]);
    heap.set_car(list, Value::Int(42)).expect("cons cell");
    assert!(heap.is_proper_list(list));
    assert_eq!(heap.car(list), Some(Value::Int(42)));
    assert_eq!(heap.list_length(list), Some(2));
}

#[test]
fn improper_list_has_no_length() {
    let mut heap = small_heap();
    let r = heap
        .alloc(Object::cons(Value::Int(1), Value::Int(2)))
        .expect("room");
    assert_eq!(heap.list_length(Value::Cons(r)), None);
    assert!(!heap.is_proper_list(Value::Cons(r)));
}
