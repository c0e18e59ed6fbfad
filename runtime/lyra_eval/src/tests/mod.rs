//! End-to-end tests exercising the machine through its public surface:
//! expressions are built with the construction entry points and run
//! through `evaluate`/`eval_top`, the way the reader and REPL drive the
//! core.

mod native_tests;
mod prop_tests;

use crate::machine::Machine;
use lyra_value::Value;

pub(crate) fn machine() -> Machine {
    Machine::new().expect("machine construction")
}

/// Intern a symbol.
pub(crate) fn sym(m: &mut Machine, name: &str) -> Value {
    m.intern(name).expect("intern")
}

/// Build a list expression from already-built elements.
pub(crate) fn list(m: &mut Machine, items: &[Value]) -> Value {
    m.list_from_slice(items).expect("list construction")
}

/// Build `(quote v)`.
pub(crate) fn quoted(m: &mut Machine, v: Value) -> Value {
    let q = sym(m, "quote");
    list(m, &[q, v])
}

/// Evaluate in the global environment, expecting success.
pub(crate) fn eval(m: &mut Machine, expr: Value) -> Value {
    m.evaluate(expr, Value::Nil).expect("evaluation succeeds")
}
