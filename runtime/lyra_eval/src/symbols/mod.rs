//! The global symbol table.
//!
//! Symbols are interned in a self-balancing binary tree of heap-allocated
//! table nodes, keyed by (precomputed hash, then name bytes). The same
//! node that deduplicates a symbol also carries its global binding, so
//! tracing the tree root traces every global.
//!
//! Interning is idempotent: equal names return the identical symbol
//! object, making symbol comparison a ref equality check everywhere else
//! in the evaluator.

use crate::errors::{self, EvalResult};
use crate::machine::Machine;
use lyra_stack::ensure_sufficient_stack;
use lyra_value::{NodeData, Object, SymbolData, SymbolFlags, Value};
use rustc_hash::FxHasher;
use std::cmp::Ordering;
use std::hash::Hasher;

#[cfg(test)]
mod tests;

/// Hash a symbol name. Computed once per symbol and stored, so tree
/// comparisons touch name bytes only on hash collisions.
pub(crate) fn hash_name(name: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(name.as_bytes());
    hasher.finish()
}

impl Machine {
    /// Intern `name`, returning the canonical symbol for it.
    pub fn intern(&mut self, name: &str) -> EvalResult {
        self.intern_flagged(name, SymbolFlags::INTERNED)
    }

    /// Intern `name` with the given flags. An already-interned symbol is
    /// returned as-is; flags only apply to a fresh symbol.
    pub(crate) fn intern_flagged(&mut self, name: &str, flags: SymbolFlags) -> EvalResult {
        let hash = hash_name(name);
        if let Some(node) = self.find_node(hash, name) {
            let data = self.node_data(node)?;
            return Ok(data.key);
        }
        // Symbol and tree node; nothing else allocates during insertion.
        self.reserve(2)?;
        let sym_ref = self.alloc_raw(Object::symbol(
            name,
            hash,
            flags | SymbolFlags::INTERNED,
        ))?;
        let sym = Value::Obj(sym_ref);
        let node_ref = self.alloc_raw(Object::node(sym))?;
        let node = Value::Obj(node_ref);
        let root = self.globals;
        self.globals = self.insert_node(root, node)?;
        Ok(sym)
    }

    /// Allocate a fresh symbol that is not entered in the table. Two
    /// uninterned symbols of equal name are distinct identities.
    pub fn uninterned_symbol(&mut self, name: &str) -> EvalResult {
        let hash = hash_name(name);
        self.reserve(1)?;
        let r = self.alloc_raw(Object::symbol(name, hash, SymbolFlags::empty()))?;
        Ok(Value::Obj(r))
    }

    /// The symbol's payload.
    pub(crate) fn symbol_data(&self, sym: Value) -> EvalResult<&SymbolData> {
        self.heap
            .symbol(sym)
            .ok_or_else(|| errors::internal("expected a symbol"))
    }

    /// The symbol's name, owned, for diagnostics.
    pub(crate) fn symbol_name(&self, sym: Value) -> String {
        self.heap
            .symbol(sym)
            .map_or_else(|| "#<non-symbol>".to_string(), |s| s.name.clone())
    }

    /// Whether `v` is a symbol object.
    pub(crate) fn is_symbol(&self, v: Value) -> bool {
        self.heap.symbol(v).is_some()
    }

    /// The tree node carrying `sym`'s global binding, if the symbol's
    /// name is in the table.
    pub(crate) fn symbol_node(&self, sym: Value) -> EvalResult<Option<Value>> {
        let data = self.symbol_data(sym)?;
        Ok(self.find_node(data.hash, &data.name))
    }

    // === Tree search ===

    /// Iterative (hash, name) search from the global root.
    pub(crate) fn find_node(&self, hash: u64, name: &str) -> Option<Value> {
        self.find_in(self.globals, hash, name)
    }

    /// Iterative (hash, name) search in an arbitrary subtree.
    pub(crate) fn find_in(&self, root: Value, hash: u64, name: &str) -> Option<Value> {
        let mut cursor = root;
        while !cursor.is_nil() {
            let node = self.heap.node(cursor)?;
            let key = self.heap.symbol(node.key)?;
            match (hash, name).cmp(&(key.hash, key.name.as_str())) {
                Ordering::Equal => return Some(cursor),
                Ordering::Less => cursor = node.left,
                Ordering::Greater => cursor = node.right,
            }
        }
        None
    }

    // === Tables ===
    //
    // A table is a header node whose `left` child holds a tree of the
    // same nodes the global namespace uses; the header's own key slot is
    // unused. Symbol keys make lookup identical to global resolution.

    fn table_root(&self, table: Value) -> EvalResult<Value> {
        match self.heap.node(table) {
            Some(header) => Ok(header.left),
            None => Err(errors::type_mismatch(
                "table",
                self.type_name_of(table),
            )),
        }
    }

    fn table_key(&self, key: Value) -> EvalResult<(u64, String)> {
        match self.heap.symbol(key) {
            Some(sym) => Ok((sym.hash, sym.name.clone())),
            None => Err(errors::type_mismatch(
                "symbol",
                self.type_name_of(key),
            )),
        }
    }

    /// Read the value bound to `key` in `table`.
    pub fn table_get(&self, table: Value, key: Value) -> EvalResult<Option<Value>> {
        let (hash, name) = self.table_key(key)?;
        let root = self.table_root(table)?;
        let Some(node) = self.find_in(root, hash, &name) else {
            return Ok(None);
        };
        let binding = self.node_data(node)?.binding;
        Ok((binding != Value::Unbound).then_some(binding))
    }

    /// Bind `key` to `value` in `table`, inserting a node on first use.
    pub fn table_put(&mut self, table: Value, key: Value, value: Value) -> EvalResult<()> {
        let (hash, name) = self.table_key(key)?;
        let root = self.table_root(table)?;
        if let Some(node) = self.find_in(root, hash, &name) {
            self.node_data_mut(node)?.binding = value;
            return Ok(());
        }
        self.push_root(table);
        self.push_root(key);
        self.push_root(value);
        let reserved = self.reserve(1);
        let value = self.pop_root()?;
        let key = self.pop_root()?;
        let table = self.pop_root()?;
        reserved?;
        let node_ref = self.alloc_raw(Object::node(key))?;
        let node = Value::Obj(node_ref);
        self.node_data_mut(node)?.binding = value;
        let root = self.table_root(table)?;
        let new_root = self.insert_node(root, node)?;
        self.node_data_mut(table)?.left = new_root;
        Ok(())
    }

    // === Tree insertion (AVL) ===
    //
    // Recursive descent bounded by tree height; allocation-free, so refs
    // held across the recursion are stable.

    pub(crate) fn insert_node(&mut self, root: Value, node: Value) -> EvalResult<Value> {
        if root.is_nil() {
            return Ok(node);
        }
        ensure_sufficient_stack(|| {
            let ord = {
                let new_key = self.node_key(node)?;
                let root_key = self.node_key(root)?;
                (new_key.hash, new_key.name.as_str()).cmp(&(root_key.hash, root_key.name.as_str()))
            };
            match ord {
                Ordering::Equal => {
                    // Search runs before insertion, so a duplicate key
                    // means the table invariant broke.
                    return Err(errors::internal("duplicate key in symbol tree"));
                }
                Ordering::Less => {
                    let left = self.node_data(root)?.left;
                    let new_left = self.insert_node(left, node)?;
                    self.node_data_mut(root)?.left = new_left;
                }
                Ordering::Greater => {
                    let right = self.node_data(root)?.right;
                    let new_right = self.insert_node(right, node)?;
                    self.node_data_mut(root)?.right = new_right;
                }
            }
            self.rebalance(root)
        })
    }

    pub(crate) fn node_data(&self, node: Value) -> EvalResult<&NodeData> {
        self.heap
            .node(node)
            .ok_or_else(|| errors::internal("expected a table node"))
    }

    pub(crate) fn node_data_mut(&mut self, node: Value) -> EvalResult<&mut NodeData> {
        self.heap
            .node_mut(node)
            .ok_or_else(|| errors::internal("expected a table node"))
    }

    fn node_key(&self, node: Value) -> EvalResult<&SymbolData> {
        let key = self.node_data(node)?.key;
        self.symbol_data(key)
    }

    fn height(&self, node: Value) -> i32 {
        if node.is_nil() {
            return 0;
        }
        self.heap.node(node).map_or(0, |n| i32::from(n.height))
    }

    fn update_height(&mut self, node: Value) -> EvalResult<()> {
        let data = self.node_data(node)?;
        let (left, right) = (data.left, data.right);
        let h = 1 + self.height(left).max(self.height(right));
        // Tree height is logarithmic in the symbol count; u8 is ample.
        self.node_data_mut(node)?.height = u8::try_from(h)
            .map_err(|_| errors::internal("symbol tree height out of range"))?;
        Ok(())
    }

    fn balance_factor(&self, node: Value) -> EvalResult<i32> {
        let data = self.node_data(node)?;
        Ok(self.height(data.left) - self.height(data.right))
    }

    fn rotate_left(&mut self, node: Value) -> EvalResult<Value> {
        let right = self.node_data(node)?.right;
        let right_left = self.node_data(right)?.left;
        self.node_data_mut(node)?.right = right_left;
        self.node_data_mut(right)?.left = node;
        self.update_height(node)?;
        self.update_height(right)?;
        Ok(right)
    }

    fn rotate_right(&mut self, node: Value) -> EvalResult<Value> {
        let left = self.node_data(node)?.left;
        let left_right = self.node_data(left)?.right;
        self.node_data_mut(node)?.left = left_right;
        self.node_data_mut(left)?.right = node;
        self.update_height(node)?;
        self.update_height(left)?;
        Ok(left)
    }

    fn rebalance(&mut self, node: Value) -> EvalResult<Value> {
        self.update_height(node)?;
        let balance = self.balance_factor(node)?;
        if balance > 1 {
            let left = self.node_data(node)?.left;
            if self.balance_factor(left)? < 0 {
                let new_left = self.rotate_left(left)?;
                self.node_data_mut(node)?.left = new_left;
            }
            return self.rotate_right(node);
        }
        if balance < -1 {
            let right = self.node_data(node)?.right;
            if self.balance_factor(right)? > 0 {
                let new_right = self.rotate_right(right)?;
                self.node_data_mut(node)?.right = new_right;
            }
            return self.rotate_left(node);
        }
        Ok(node)
    }
}
