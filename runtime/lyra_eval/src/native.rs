//! The native-call registration contract.
//!
//! A foreign routine plugs into application dispatch by providing a
//! [`NativeDef`]: a name, a minimum arity, a variadic flag, and a callable
//! conforming to one of the fixed call shapes below. Fixed shapes receive
//! 0–6 direct arguments; variadic routines receive the full argument
//! slice.
//!
//! Arity is validated by the evaluator before the callable runs: exact
//! count for fixed shapes, at-least-minimum for variadic ones.
//!
//! Callables receive the machine and may allocate or evaluate through it.
//! Argument `Value`s are passed by copy and are valid until the callable's
//! first allocating call; a callable that allocates must keep arguments it
//! still needs reachable (the machine's construction entry points root
//! their own parameters, so plain data-building chains are safe).

use crate::errors::{self, EvalResult};
use crate::machine::Machine;
use lyra_value::{NativeId, Object, ProcBody, ProcData, ProcFlags, Value};

/// 0-argument callable.
pub type Native0 = fn(&mut Machine) -> EvalResult;
/// 1-argument callable.
pub type Native1 = fn(&mut Machine, Value) -> EvalResult;
/// 2-argument callable.
pub type Native2 = fn(&mut Machine, Value, Value) -> EvalResult;
/// 3-argument callable.
pub type Native3 = fn(&mut Machine, Value, Value, Value) -> EvalResult;
/// 4-argument callable.
pub type Native4 = fn(&mut Machine, Value, Value, Value, Value) -> EvalResult;
/// 5-argument callable.
pub type Native5 = fn(&mut Machine, Value, Value, Value, Value, Value) -> EvalResult;
/// 6-argument callable.
pub type Native6 = fn(&mut Machine, Value, Value, Value, Value, Value, Value) -> EvalResult;
/// Variadic callable: receives all arguments in order.
pub type NativeSlice = fn(&mut Machine, &[Value]) -> EvalResult;

/// The fixed call shapes a native routine may conform to.
#[derive(Clone, Copy)]
pub enum NativeCall {
    /// No arguments.
    Zero(Native0),
    /// One direct argument.
    One(Native1),
    /// Two direct arguments.
    Two(Native2),
    /// Three direct arguments.
    Three(Native3),
    /// Four direct arguments.
    Four(Native4),
    /// Five direct arguments.
    Five(Native5),
    /// Six direct arguments.
    Six(Native6),
    /// All arguments as a slice. Required for variadic routines.
    Slice(NativeSlice),
}

impl NativeCall {
    /// The exact argument count of a fixed shape, `None` for `Slice`.
    pub fn fixed_arity(&self) -> Option<u8> {
        match self {
            NativeCall::Zero(_) => Some(0),
            NativeCall::One(_) => Some(1),
            NativeCall::Two(_) => Some(2),
            NativeCall::Three(_) => Some(3),
            NativeCall::Four(_) => Some(4),
            NativeCall::Five(_) => Some(5),
            NativeCall::Six(_) => Some(6),
            NativeCall::Slice(_) => None,
        }
    }
}

/// Registration record for one native routine.
#[derive(Clone, Copy)]
pub struct NativeDef {
    /// The global name the routine is bound to.
    pub name: &'static str,
    /// Minimum accepted argument count.
    pub min_arity: u8,
    /// Whether counts above the minimum are accepted.
    pub variadic: bool,
    /// The callable.
    pub call: NativeCall,
}

impl NativeDef {
    /// Check internal consistency: a variadic routine must use the slice
    /// shape, and a fixed shape's argument count must match `min_arity`.
    pub(crate) fn validate(&self) -> EvalResult<()> {
        match (self.variadic, self.call.fixed_arity()) {
            (true, Some(_)) => Err(errors::internal(format!(
                "native `{}`: variadic routines must use the slice shape",
                self.name
            ))),
            (false, Some(n)) if n != self.min_arity => Err(errors::internal(format!(
                "native `{}`: shape takes {n} arguments but min_arity is {}",
                self.name, self.min_arity
            ))),
            _ => Ok(()),
        }
    }
}

impl Machine {
    /// Add a native to the call table and wrap it in an (unbound)
    /// procedure object.
    pub(crate) fn alloc_native_proc(&mut self, def: NativeDef) -> EvalResult<(Value, NativeId)> {
        def.validate()?;
        let id = NativeId::from_raw(self.natives.len() as u32);
        self.natives.push(def);
        self.reserve(1)?;
        let mut flags = ProcFlags::NATIVE;
        if def.variadic {
            flags |= ProcFlags::VARIADIC;
        }
        let r = self.alloc_raw(Object::procedure(ProcData {
            flags,
            min_arity: def.min_arity,
            params: Value::Nil,
            env: Value::Nil,
            body: ProcBody::Native(id),
        }))?;
        Ok((Value::Obj(r), id))
    }

    /// Register a native routine: add it to the call table, wrap it in a
    /// procedure, and bind that procedure to the routine's name in the
    /// global environment. Returns the procedure value.
    pub fn register_native(&mut self, def: NativeDef) -> EvalResult {
        let name = def.name;
        let (proc, _id) = self.alloc_native_proc(def)?;
        self.push_root(proc);
        let sym = self.intern(name)?;
        let proc = self.pop_root()?;
        let node = self
            .symbol_node(sym)?
            .ok_or_else(|| errors::internal("freshly interned symbol lacks a node"))?;
        self.node_data_mut(node)?.binding = proc;
        Ok(proc)
    }

    /// Invoke a registered native. The caller has already validated arity
    /// against the owning procedure, so a shape mismatch here is an
    /// internal invariant violation.
    pub(crate) fn invoke_native(&mut self, id: NativeId, args: &[Value]) -> EvalResult {
        let def = *self
            .natives
            .get(id.raw() as usize)
            .ok_or_else(|| errors::internal("native id out of range"))?;
        match (def.call, args) {
            (NativeCall::Zero(f), []) => f(self),
            (NativeCall::One(f), &[a]) => f(self, a),
            (NativeCall::Two(f), &[a, b]) => f(self, a, b),
            (NativeCall::Three(f), &[a, b, c]) => f(self, a, b, c),
            (NativeCall::Four(f), &[a, b, c, d]) => f(self, a, b, c, d),
            (NativeCall::Five(f), &[a, b, c, d, e]) => f(self, a, b, c, d, e),
            (NativeCall::Six(f), &[a, b, c, d, e, g]) => f(self, a, b, c, d, e, g),
            (NativeCall::Slice(f), all) => f(self, all),
            _ => Err(errors::internal(format!(
                "native `{}` invoked with unvalidated argument count {}",
                def.name,
                args.len()
            ))),
        }
    }
}
