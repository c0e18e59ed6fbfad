//! The machine: one self-contained interpreter instance.
//!
//! All interpreter state lives here — the heap, the type registry, the
//! native-call table, the global symbol tree, the evaluator's registers
//! and continuation stack, and the scratch root stack. There are no
//! process-wide statics; independent machines coexist freely.
//!
//! # Allocation discipline
//!
//! A collection can run inside any allocating call and relocates every
//! heap object, so a `Value` held in a plain local is stale afterwards.
//! The rules used throughout this crate:
//!
//! - Values that must survive an allocating call are parked in the
//!   scratch stack (or the registers / continuation stack) first and
//!   re-read afterwards.
//! - Multi-step construction reserves all slots up front with
//!   [`Machine::reserve`], after which `alloc_raw` cannot collect and
//!   locals stay valid.

use crate::builtins;
use crate::errors::{self, EvalResult};
use crate::eval::Frame;
use crate::native::NativeDef;
use lyra_diagnostic::Diagnostic;
use lyra_heap::{CollectSummary, GcStats, Heap, HeapConfig, Trace};
use lyra_value::{
    display_value, Object, Ref, RegistryError, SymbolFlags, TypeDescriptor, TypeIdx, TypeRegistry,
    Value,
};


/// Machine configuration.
#[derive(Clone, Copy, Debug)]
pub struct MachineConfig {
    /// Heap region sizing.
    pub heap: HeapConfig,
    /// Limit on the continuation stack. The stack grows by reallocation
    /// up to this depth; exceeding it is a fatal OVERFLOW.
    pub max_stack_depth: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            heap: HeapConfig::default(),
            max_stack_depth: 100_000,
        }
    }
}

/// The evaluator's dedicated registers. All of them are collector roots.
#[derive(Debug, Default)]
pub(crate) struct Registers {
    /// Expression being evaluated.
    pub expr: Value,
    /// Environment of the current expression.
    pub env: Value,
    /// Most recently produced value.
    pub val: Value,
    /// Scratch register.
    pub tmp_a: Value,
    /// Scratch register.
    pub tmp_b: Value,
}

impl Trace for Registers {
    fn trace(&mut self, visit: &mut dyn FnMut(&mut Value)) {
        visit(&mut self.expr);
        visit(&mut self.env);
        visit(&mut self.val);
        visit(&mut self.tmp_a);
        visit(&mut self.tmp_b);
    }
}

/// Pre-interned special-form symbols, compared by identity during
/// dispatch.
#[derive(Debug, Default)]
pub(crate) struct SpecialNames {
    pub quote: Value,
    pub setv: Value,
    pub def: Value,
    pub do_: Value,
    pub let_: Value,
    pub if_: Value,
    pub fn_: Value,
    pub macro_: Value,
}

impl Trace for SpecialNames {
    fn trace(&mut self, visit: &mut dyn FnMut(&mut Value)) {
        visit(&mut self.quote);
        visit(&mut self.setv);
        visit(&mut self.def);
        visit(&mut self.do_);
        visit(&mut self.let_);
        visit(&mut self.if_);
        visit(&mut self.fn_);
        visit(&mut self.macro_);
    }
}

/// Pre-interned core constant symbols.
#[derive(Debug, Default)]
pub(crate) struct Constants {
    /// The `t` symbol, bound to itself.
    pub t: Value,
    /// The `ok` symbol, bound to itself.
    pub ok: Value,
    /// The `error` symbol: the sentinel returned by `eval_top` after a
    /// recoverable failure.
    pub error: Value,
}

impl Trace for Constants {
    fn trace(&mut self, visit: &mut dyn FnMut(&mut Value)) {
        visit(&mut self.t);
        visit(&mut self.ok);
        visit(&mut self.error);
    }
}

/// One interpreter instance.
pub struct Machine {
    pub(crate) heap: Heap,
    pub(crate) registry: TypeRegistry,
    pub(crate) natives: Vec<NativeDef>,
    /// Root of the global symbol tree (`Nil` while empty).
    pub(crate) globals: Value,
    pub(crate) regs: Registers,
    /// The explicit continuation stack.
    pub(crate) stack: Vec<Frame>,
    /// Shadow root stack for values that must survive an allocation.
    pub(crate) scratch: Vec<Value>,
    /// Constructor procedures indexed by type, `Nil` where absent.
    pub(crate) ctors: Vec<Value>,
    pub(crate) special: SpecialNames,
    pub(crate) consts: Constants,
    pub(crate) last_diagnostic: Option<Diagnostic>,
    pub(crate) max_stack_depth: usize,
}

impl Machine {
    /// A machine with default configuration, core constants interned and
    /// builtins registered.
    pub fn new() -> EvalResult<Self> {
        Self::with_config(MachineConfig::default())
    }

    /// A machine with the given configuration.
    pub fn with_config(config: MachineConfig) -> EvalResult<Self> {
        let registry = TypeRegistry::with_builtins();
        let mut machine = Machine {
            heap: Heap::new(config.heap),
            registry,
            natives: Vec::new(),
            globals: Value::Nil,
            regs: Registers::default(),
            stack: Vec::new(),
            scratch: Vec::new(),
            ctors: vec![Value::Nil; TypeIdx::MAX_TYPES],
            special: SpecialNames::default(),
            consts: Constants::default(),
            last_diagnostic: None,
            max_stack_depth: config.max_stack_depth,
        };
        builtins::install(&mut machine)?;
        Ok(machine)
    }

    /// Heap statistics.
    pub fn gc_stats(&self) -> &GcStats {
        self.heap.stats()
    }

    /// Read access to the heap.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Read access to the type registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The diagnostic produced by the most recent failed top-level
    /// evaluation, if any.
    pub fn last_diagnostic(&self) -> Option<&Diagnostic> {
        self.last_diagnostic.as_ref()
    }

    /// The `t` constant.
    pub fn truth(&self) -> Value {
        self.consts.t
    }

    /// `t` or `nil` for a host boolean.
    pub fn boolean(&self, b: bool) -> Value {
        if b {
            self.consts.t
        } else {
            Value::Nil
        }
    }

    /// Render a value `write`-style.
    pub fn display(&self, value: Value) -> String {
        display_value(&self.registry, &self.heap, value)
    }

    /// The type name of a value, for diagnostics.
    pub fn type_name_of(&self, value: Value) -> &str {
        self.registry.type_name_of(&self.heap, value)
    }

    /// Structural equality through the registry's comparators.
    pub fn structural_eq(&self, a: Value, b: Value) -> bool {
        lyra_value::structural_eq(&self.registry, &self.heap, a, b)
    }

    /// Structural ordering through the registry's comparators.
    pub fn structural_compare(&self, a: Value, b: Value) -> Option<std::cmp::Ordering> {
        lyra_value::structural_compare(&self.registry, &self.heap, a, b)
    }

    /// Register a new user-visible type and bind its name (as a constant)
    /// to the descriptor in the global environment. Exceeding the
    /// registry's hard maximum is a fatal OVERFLOW.
    pub fn register_type(&mut self, descriptor: TypeDescriptor) -> EvalResult<TypeIdx> {
        let name = descriptor.name.clone();
        let idx = self.registry.register(descriptor).map_err(|e| {
            let RegistryError::Overflow { count, max } = e;
            errors::registry_overflow(count, max)
        })?;
        let sym = self.intern_flagged(&name, SymbolFlags::CONSTANT)?;
        let node = self
            .symbol_node(sym)?
            .ok_or_else(|| errors::internal("freshly interned symbol lacks a node"))?;
        self.node_data_mut(node)?.binding = Value::Type(idx);
        Ok(idx)
    }

    // === Collection wiring ===

    /// Run a collection now, tracing the machine's full root set: the
    /// global symbol tree, every continuation-stack slot, the registers,
    /// the scratch roots, the constructor table, and the pre-interned
    /// names.
    pub(crate) fn collect_now(&mut self) -> CollectSummary {
        let Machine {
            heap,
            globals,
            regs,
            stack,
            scratch,
            ctors,
            special,
            consts,
            ..
        } = self;
        let mut roots: [&mut dyn Trace; 7] =
            [globals, regs, stack, scratch, ctors, special, consts];
        heap.collect(&mut roots)
    }

    /// Ensure at least `slots` free slots, collecting (and once, growing)
    /// as needed. Fails with a fatal OVERFLOW when even a grown region
    /// cannot hold the live set plus the request.
    pub(crate) fn reserve(&mut self, slots: usize) -> EvalResult<()> {
        if self.heap.free_slots() >= slots {
            return Ok(());
        }
        self.collect_now();
        if self.heap.free_slots() >= slots {
            return Ok(());
        }
        // Retry once with forced growth.
        self.heap.request_growth();
        self.collect_now();
        if self.heap.free_slots() >= slots {
            return Ok(());
        }
        Err(errors::heap_exhausted(
            self.heap.live_slots(),
            self.heap.capacity(),
        ))
    }

    /// Allocate without reserving. Only valid after [`Machine::reserve`]
    /// covered this slot; a full region here is an internal invariant
    /// violation, not a trigger for collection.
    pub(crate) fn alloc_raw(&mut self, object: Object) -> EvalResult<Ref> {
        self.heap
            .alloc(object)
            .map_err(|_| errors::internal("allocation without reservation"))
    }

    // === Scratch roots ===

    pub(crate) fn push_root(&mut self, value: Value) {
        self.scratch.push(value);
    }

    pub(crate) fn pop_root(&mut self) -> EvalResult<Value> {
        self.scratch
            .pop()
            .ok_or_else(|| errors::internal("scratch root stack underflow"))
    }

    // === Construction entry points ===

    /// Allocate a cons cell. The proper-list status and cached length are
    /// derived from the tail at construction: a `Nil` or valid-list tail
    /// makes the new cell a list head.
    pub fn cons(&mut self, car: Value, cdr: Value) -> EvalResult {
        self.push_root(car);
        self.push_root(cdr);
        self.reserve(1)?;
        let cdr = self.pop_root()?;
        let car = self.pop_root()?;
        self.cons_raw(car, cdr)
    }

    /// Cons without reserving; the slot must already be covered.
    pub(crate) fn cons_raw(&mut self, car: Value, cdr: Value) -> EvalResult {
        let proper_len = match cdr {
            Value::Nil => Some(1),
            Value::List(r) => self.heap.object(r).header.cached_len().map(|n| n + 1),
            _ => None,
        };
        match proper_len {
            Some(len) => {
                let r = self.alloc_raw(Object::list_cons(car, cdr, len))?;
                Ok(Value::List(r))
            }
            None => {
                let r = self.alloc_raw(Object::cons(car, cdr))?;
                Ok(Value::Cons(r))
            }
        }
    }

    /// Allocate a string.
    pub fn alloc_string(&mut self, s: &str) -> EvalResult {
        self.reserve(1)?;
        let r = self.alloc_raw(Object::string(s))?;
        Ok(Value::Str(r))
    }

    /// Allocate a port object. The core models only the identity; the
    /// foreign-procedure layer owns the actual I/O.
    pub fn alloc_port(&mut self, name: &str, open: bool) -> EvalResult {
        self.reserve(1)?;
        let r = self.alloc_raw(Object::port(name, open))?;
        Ok(Value::Obj(r))
    }

    /// Allocate a fresh, empty table.
    pub fn alloc_table(&mut self) -> EvalResult {
        self.reserve(1)?;
        let r = self.alloc_raw(Object::node(Value::Nil))?;
        Ok(Value::Obj(r))
    }

    /// Allocate a table node keyed by `key`, for reader/builtin use.
    pub fn alloc_node(&mut self, key: Value) -> EvalResult {
        self.push_root(key);
        self.reserve(1)?;
        let key = self.pop_root()?;
        let r = self.alloc_raw(Object::node(key))?;
        Ok(Value::Obj(r))
    }

    /// Build a proper list from a slice of values.
    pub fn list_from_slice(&mut self, items: &[Value]) -> EvalResult {
        let n = items.len();
        let base = self.scratch.len();
        self.scratch.extend_from_slice(items);
        let reserved = self.reserve(n);
        if let Err(e) = reserved {
            self.scratch.truncate(base);
            return Err(e);
        }
        let mut tail = Value::Nil;
        for i in (0..n).rev() {
            let item = self.scratch[base + i];
            tail = self.cons_raw(item, tail)?;
        }
        self.scratch.truncate(base);
        Ok(tail)
    }

    /// Build the reverse of a proper list.
    pub fn list_reverse(&mut self, list: Value) -> EvalResult {
        let cursor_slot = self.scratch.len();
        self.push_root(list);
        let acc_slot = self.scratch.len();
        self.push_root(Value::Nil);
        loop {
            let cursor = self.scratch[cursor_slot];
            if cursor.is_nil() {
                break;
            }
            let Some((car, _)) = self.heap.as_cons(cursor) else {
                self.scratch.truncate(cursor_slot);
                return Err(errors::improper_list("reversed list"));
            };
            let acc = self.scratch[acc_slot];
            let cell = match self.cons(car, acc) {
                Ok(cell) => cell,
                Err(e) => {
                    self.scratch.truncate(cursor_slot);
                    return Err(e);
                }
            };
            self.scratch[acc_slot] = cell;
            // Re-read the cursor: the cons may have collected.
            let cursor = self.scratch[cursor_slot];
            let cdr = self
                .heap
                .cdr(cursor)
                .ok_or_else(|| errors::internal("list spine changed mid-reverse"))?;
            self.scratch[cursor_slot] = cdr;
        }
        let acc = self.scratch[acc_slot];
        self.scratch.truncate(cursor_slot);
        Ok(acc)
    }
}
