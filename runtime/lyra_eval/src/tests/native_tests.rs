//! The native-call registration contract, exercised the way the
//! foreign-function layer uses it.

use super::{eval, list, machine, sym};
use crate::errors;
use crate::native::{NativeCall, NativeDef};
use lyra_diagnostic::ErrorCode;
use lyra_value::Value;
use pretty_assertions::assert_eq;

fn int_args(machine: &crate::Machine, args: &[Value]) -> Result<Vec<i64>, crate::EvalError> {
    args.iter()
        .map(|a| {
            a.as_int()
                .ok_or_else(|| errors::type_mismatch("int", machine.type_name_of(*a)))
        })
        .collect()
}

fn sum_all(machine: &mut crate::Machine, args: &[Value]) -> crate::EvalResult {
    let ints = int_args(machine, args)?;
    Ok(Value::Int(ints.iter().sum()))
}

fn must_not_run(_machine: &mut crate::Machine, _a: Value, _b: Value) -> crate::EvalResult {
    Err(errors::internal("callable ran despite an arity mismatch"))
}

fn make_pair(machine: &mut crate::Machine, a: Value, b: Value) -> crate::EvalResult {
    machine.cons(a, b)
}

#[test]
fn registered_natives_are_globally_callable() {
    let mut m = machine();
    m.register_native(NativeDef {
        name: "sum-all",
        min_arity: 1,
        variadic: true,
        call: NativeCall::Slice(sum_all),
    })
    .expect("registration");

    let f = sym(&mut m, "sum-all");
    let expr = list(
        &mut m,
        &[f, Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)],
    );
    assert_eq!(eval(&mut m, expr), Value::Int(10));
}

#[test]
fn arity_is_validated_before_the_callable_runs() {
    let mut m = machine();
    m.register_native(NativeDef {
        name: "two-only",
        min_arity: 2,
        variadic: false,
        call: NativeCall::Two(must_not_run),
    })
    .expect("registration");

    let f = sym(&mut m, "two-only");
    let expr = list(&mut m, &[f, Value::Int(1)]);
    let err = m.evaluate(expr, Value::Nil).expect_err("one of two args");
    // ARITY, not the INTERNAL the callable would have raised.
    assert_eq!(err.code, ErrorCode::Arity);
}

#[test]
fn variadic_minimum_is_enforced() {
    let mut m = machine();
    m.register_native(NativeDef {
        name: "sum-some",
        min_arity: 1,
        variadic: true,
        call: NativeCall::Slice(sum_all),
    })
    .expect("registration");

    let f = sym(&mut m, "sum-some");
    let expr = list(&mut m, &[f]);
    let err = m.evaluate(expr, Value::Nil).expect_err("below the minimum");
    assert_eq!(err.code, ErrorCode::Arity);
}

#[test]
fn fixed_shape_natives_receive_direct_arguments() {
    let mut m = machine();
    m.register_native(NativeDef {
        name: "pair-up",
        min_arity: 2,
        variadic: false,
        call: NativeCall::Two(make_pair),
    })
    .expect("registration");

    let f = sym(&mut m, "pair-up");
    let expr = list(&mut m, &[f, Value::Int(1), Value::Int(2)]);
    let result = eval(&mut m, expr);
    assert_eq!(m.display(result), "(1 . 2)");
}

#[test]
fn inconsistent_definitions_are_rejected() {
    let mut m = machine();
    // Variadic with a fixed shape.
    let err = m
        .register_native(NativeDef {
            name: "bad-variadic",
            min_arity: 1,
            variadic: true,
            call: NativeCall::Two(must_not_run),
        })
        .expect_err("variadic requires the slice shape");
    assert_eq!(err.code, ErrorCode::Internal);

    // Fixed shape disagreeing with min_arity.
    let err = m
        .register_native(NativeDef {
            name: "bad-arity",
            min_arity: 3,
            variadic: false,
            call: NativeCall::Two(must_not_run),
        })
        .expect_err("shape and arity disagree");
    assert_eq!(err.code, ErrorCode::Internal);
}

#[test]
fn natives_can_reenter_the_evaluator() {
    let mut m = machine();
    // apply is itself a native that re-enters the machine.
    let apply_s = sym(&mut m, "apply");
    let plus = sym(&mut m, "+");
    let list_s = sym(&mut m, "list");
    let args_form = list(&mut m, &[list_s, Value::Int(40), Value::Int(2)]);
    let expr = list(&mut m, &[apply_s, plus, args_form]);
    assert_eq!(eval(&mut m, expr), Value::Int(42));
}
