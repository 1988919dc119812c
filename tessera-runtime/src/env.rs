// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Activations: lexically scoped name-to-value frames.
//!
//! Name lookup climbs the parent chain. Each interpreter has one base
//! activation holding predeclared values; programs and function bodies push
//! children. Closures capture an `Rc` of their defining activation, so
//! variables are individual shared cells.

use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::values::Value;

/// A single variable slot. Shared between an activation and any closures
/// that captured it.
pub type VariableCell = Rc<RefCell<Value>>;

pub struct Activation {
    parent: Option<Rc<Activation>>,
    bindings: RefCell<IndexMap<String, VariableCell>>,
}

impl Activation {
    /// The root activation of an interpreter, holding predeclared values.
    pub fn base() -> Rc<Activation> {
        Rc::new(Activation {
            parent: None,
            bindings: RefCell::new(IndexMap::new()),
        })
    }

    pub fn child(parent: &Rc<Activation>) -> Rc<Activation> {
        Rc::new(Activation {
            parent: Some(Rc::clone(parent)),
            bindings: RefCell::new(IndexMap::new()),
        })
    }

    /// Defines `name` in this frame, shadowing any outer binding.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.bindings
            .borrow_mut()
            .insert(name.into(), Rc::new(RefCell::new(value)));
    }

    /// The cell bound to `name`, searching this frame and then the chain.
    pub fn lookup(&self, name: &str) -> Option<VariableCell> {
        if let Some(cell) = self.bindings.borrow().get(name) {
            return Some(Rc::clone(cell));
        }
        self.parent.as_ref()?.lookup(name)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.lookup(name).map(|cell| cell.borrow().clone())
    }

    /// Assigns to an existing binding anywhere in the chain. Returns false
    /// if `name` is unbound.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        match self.lookup(name) {
            Some(cell) => {
                *cell.borrow_mut() = value;
                true
            }
            None => false,
        }
    }

    /// Whether `name` is bound in this frame only (not the chain).
    pub fn defines_locally(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }
}

impl fmt::Debug for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.bindings.borrow().keys().cloned().collect();
        f.debug_struct("Activation")
            .field("bindings", &names)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::NumberValue;

    #[test]
    fn test_lookup_climbs_chain() {
        let base = Activation::base();
        base.define("x", Value::Bool(true));
        let inner = Activation::child(&base);
        assert!(matches!(inner.get("x"), Some(Value::Bool(true))));
        assert!(inner.get("y").is_none());
    }

    #[test]
    fn test_shadowing() {
        let base = Activation::base();
        base.define("x", Value::uint64(1));
        let inner = Activation::child(&base);
        inner.define("x", Value::uint64(2));
        assert!(matches!(
            inner.get("x"),
            Some(Value::Number(NumberValue::UInt64(2)))
        ));
        assert!(matches!(
            base.get("x"),
            Some(Value::Number(NumberValue::UInt64(1)))
        ));
    }

    #[test]
    fn test_assignment_writes_defining_frame() {
        let base = Activation::base();
        base.define("x", Value::uint64(1));
        let inner = Activation::child(&base);
        assert!(inner.assign("x", Value::uint64(7)));
        assert!(matches!(
            base.get("x"),
            Some(Value::Number(NumberValue::UInt64(7)))
        ));
        assert!(!inner.assign("missing", Value::Nil));
    }

    #[test]
    fn test_cells_are_shared_with_captures() {
        let base = Activation::base();
        base.define("count", Value::uint64(0));
        let captured = base.lookup("count").unwrap();
        assert!(base.assign("count", Value::uint64(41)));
        assert!(matches!(
            &*captured.borrow(),
            Value::Number(NumberValue::UInt64(41))
        ));
    }
}
