//! Environment frames and binding resolution.
//!
//! An environment is a chain of local frames terminating in `Nil`, which
//! denotes the global frame (the symbol tree). A local frame holds
//! parallel name/value sequences; lookup scans them newest-first so a
//! name extended twice in one frame resolves to the later binding. The
//! global frame resolves through the symbol tree, where each node's
//! binding slot carries the global value.
//!
//! [`Location`] is the read/write seam: `lookup` resolves a name once and
//! the caller reads or writes through the location without re-searching.

use crate::errors::{self, EvalResult};
use crate::machine::Machine;
use lyra_heap::Trace;
use lyra_value::{FrameData, Object, Value};


/// A resolved binding site, usable for both read and write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    /// A node of the global symbol tree.
    Global(Value),
    /// A slot of a local frame.
    Local {
        /// The frame object.
        frame: Value,
        /// Index into the frame's parallel sequences.
        index: usize,
    },
}

impl Trace for Location {
    fn trace(&mut self, visit: &mut dyn FnMut(&mut Value)) {
        match self {
            Location::Global(node) => visit(node),
            Location::Local { frame, .. } => visit(frame),
        }
    }
}

impl Machine {
    /// Allocate a fresh local frame chained onto `parent`.
    pub fn new_frame(&mut self, parent: Value) -> EvalResult {
        self.push_root(parent);
        self.reserve(1)?;
        let parent = self.pop_root()?;
        let r = self.alloc_raw(Object::frame(parent))?;
        Ok(Value::Obj(r))
    }

    pub(crate) fn frame_data(&self, frame: Value) -> EvalResult<&FrameData> {
        self.heap
            .frame(frame)
            .ok_or_else(|| errors::internal("expected an environment frame"))
    }

    pub(crate) fn frame_data_mut(&mut self, frame: Value) -> EvalResult<&mut FrameData> {
        self.heap
            .frame_mut(frame)
            .ok_or_else(|| errors::internal("expected an environment frame"))
    }

    /// Resolve `name` to a location, walking the frame chain outward from
    /// `env`. Returns `None` when no local frame binds the name and the
    /// symbol has no node in the global tree.
    pub fn resolve(&self, name: Value, env: Value) -> EvalResult<Option<Location>> {
        let mut cursor = env;
        while !cursor.is_nil() {
            let frame = self.frame_data(cursor)?;
            // Newest-first: later extensions shadow earlier ones.
            if let Some(index) = frame.names.iter().rposition(|&n| n == name) {
                return Ok(Some(Location::Local {
                    frame: cursor,
                    index,
                }));
            }
            cursor = frame.parent;
        }
        Ok(self.symbol_node(name)?.map(Location::Global))
    }

    /// Read through a location.
    pub fn location_read(&self, location: &Location) -> EvalResult {
        match location {
            Location::Global(node) => Ok(self.node_data(*node)?.binding),
            Location::Local { frame, index } => {
                let frame = self.frame_data(*frame)?;
                frame
                    .values
                    .get(*index)
                    .copied()
                    .ok_or_else(|| errors::internal("frame slot index out of range"))
            }
        }
    }

    /// Write through a location.
    pub fn location_write(&mut self, location: &Location, value: Value) -> EvalResult<()> {
        match location {
            Location::Global(node) => {
                self.node_data_mut(*node)?.binding = value;
                Ok(())
            }
            Location::Local { frame, index } => {
                let frame = self.frame_data_mut(*frame)?;
                match frame.values.get_mut(*index) {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => Err(errors::internal("frame slot index out of range")),
                }
            }
        }
    }

    /// Evaluate a symbol reference: resolve and read, raising UNBOUND for
    /// a missing or never-assigned binding.
    pub fn lookup_value(&self, name: Value, env: Value) -> EvalResult {
        let Some(location) = self.resolve(name, env)? else {
            return Err(errors::unbound_symbol(&self.symbol_name(name)));
        };
        let value = self.location_read(&location)?;
        if value == Value::Unbound {
            return Err(errors::unbound_symbol(&self.symbol_name(name)));
        }
        Ok(value)
    }

    /// Bind `name` in the innermost frame of `env` with an unbound
    /// placeholder, returning the new location. Raises NAME for constant
    /// symbols.
    pub fn extend(&mut self, name: Value, env: Value) -> EvalResult<Location> {
        if self.symbol_data(name)?.is_constant() {
            return Err(errors::constant_symbol(&self.symbol_name(name)));
        }
        if env.is_nil() {
            // Global frame: the symbol's tree node is the location. An
            // uninterned symbol gets a node keyed through its name.
            if let Some(node) = self.symbol_node(name)? {
                return Ok(Location::Global(node));
            }
            self.push_root(name);
            self.reserve(1)?;
            let name = self.pop_root()?;
            let node_ref = self.alloc_raw(Object::node(name))?;
            let node = Value::Obj(node_ref);
            let root = self.globals;
            self.globals = self.insert_node(root, node)?;
            return Ok(Location::Global(node));
        }
        let frame = self.frame_data_mut(env)?;
        frame.names.push(name);
        frame.values.push(Value::Unbound);
        Ok(Location::Local {
            frame: env,
            index: frame_len_after_push(frame),
        })
    }

    /// Assign `value` to an existing binding of `name`. Raises NAME for
    /// constant symbols and UNBOUND when no assigned binding exists.
    pub fn assign(&mut self, name: Value, value: Value, env: Value) -> EvalResult<()> {
        if self.symbol_data(name)?.is_constant() {
            return Err(errors::constant_symbol(&self.symbol_name(name)));
        }
        let Some(location) = self.resolve(name, env)? else {
            return Err(errors::unbound_symbol(&self.symbol_name(name)));
        };
        // A global node that was never assigned is "not found" for
        // assignment purposes; a local placeholder is assignable (it was
        // explicitly extended).
        if let Location::Global(_) = location {
            if self.location_read(&location)? == Value::Unbound {
                return Err(errors::unbound_symbol(&self.symbol_name(name)));
            }
        }
        self.location_write(&location, value)
    }
}

fn frame_len_after_push(frame: &FrameData) -> usize {
    frame.values.len() - 1
}
