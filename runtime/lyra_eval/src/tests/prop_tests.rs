//! Property tests: randomly shaped expression trees evaluate to the value
//! a host-side mirror computes.

use super::{machine, sym};
use crate::machine::Machine;
use lyra_value::Value;
use proptest::prelude::*;

/// Host-side mirror of an arithmetic expression.
#[derive(Clone, Debug)]
enum Arith {
    Lit(i64),
    Add(Box<Arith>, Box<Arith>),
    Sub(Box<Arith>, Box<Arith>),
    Mul(Box<Arith>, Box<Arith>),
}

fn arith_strategy() -> impl Strategy<Value = Arith> {
    // Leaves in [-9, 9] and depth <= 4 keep every intermediate result
    // far inside i64 range (|result| <= 9^16).
    let leaf = (-9i64..=9).prop_map(Arith::Lit);
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Arith::Add(Box::new(a), Box::new(b))),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Arith::Sub(Box::new(a), Box::new(b))),
            (inner.clone(), inner).prop_map(|(a, b)| Arith::Mul(Box::new(a), Box::new(b))),
        ]
    })
}

fn expected(tree: &Arith) -> i64 {
    match tree {
        Arith::Lit(i) => *i,
        Arith::Add(a, b) => expected(a) + expected(b),
        Arith::Sub(a, b) => expected(a) - expected(b),
        Arith::Mul(a, b) => expected(a) * expected(b),
    }
}

fn build(m: &mut Machine, tree: &Arith) -> Value {
    match tree {
        Arith::Lit(i) => Value::Int(*i),
        Arith::Add(a, b) => build_binary(m, "+", a, b),
        Arith::Sub(a, b) => build_binary(m, "-", a, b),
        Arith::Mul(a, b) => build_binary(m, "*", a, b),
    }
}

fn build_binary(m: &mut Machine, op: &str, a: &Arith, b: &Arith) -> Value {
    let left = build(m, a);
    m.push_root(left);
    let right = build(m, b);
    let left = m.pop_root().expect("root");
    m.push_root(left);
    m.push_root(right);
    let op = sym(m, op);
    let right = m.pop_root().expect("root");
    let left = m.pop_root().expect("root");
    m.list_from_slice(&[op, left, right]).expect("list")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn arithmetic_trees_evaluate_like_the_host(tree in arith_strategy()) {
        let mut m = machine();
        let expr = build(&mut m, &tree);
        let result = m.evaluate(expr, Value::Nil).expect("arithmetic evaluates");
        prop_assert_eq!(result, Value::Int(expected(&tree)));
    }

    #[test]
    fn quoting_any_tree_returns_it_verbatim(tree in arith_strategy()) {
        let mut m = machine();
        let expr = build(&mut m, &tree);
        m.push_root(expr);
        let q = sym(&mut m, "quote");
        let expr = m.pop_root().expect("root");
        let quoted = m.list_from_slice(&[q, expr]).expect("list");
        let result = m.evaluate(quoted, Value::Nil).expect("quote evaluates");
        prop_assert_eq!(result, expr, "quote is identity on the datum");
        // Structural equality holds as well as identity.
        prop_assert!(m.structural_eq(result, expr));
    }
}
