//! Lazily-evaluated, interned mapping-expression DAG.
//!
//! An expression represents an unevaluated (or cached) combination of
//! mapping functions: constants, settable variables, and the inverse /
//! compose / add-root-identity combinators. Nodes are interned per engine,
//! so structurally equal combinator chains share one node and one cache;
//! reassigning a variable invalidates exactly the expressions built over it.
//!
//! Handles are cheap to clone and compare by node identity. The null handle
//! (`MapExpr::null()`) is "unset", which is not the identity expression.

mod node;
mod registry;
mod variable;

use std::sync::Arc;

use crate::diagnostic::{self, MapError};
use crate::function::MapFunction;

pub(crate) use node::{Node, Op};
pub(crate) use registry::{Key, Registry};
pub use variable::MapVariable;

/// A ref-counted handle to a mapping-expression node; possibly null.
#[derive(Clone, Default)]
pub struct MapExpr {
    node: Option<Arc<Node>>,
}

impl MapExpr {
    /// The null (unset) handle. Distinct from the identity expression.
    pub fn null() -> MapExpr {
        MapExpr { node: None }
    }

    pub(crate) fn from_node(node: Arc<Node>) -> MapExpr {
        MapExpr { node: Some(node) }
    }

    pub(crate) fn constant_in(registry: &Arc<Registry>, value: MapFunction) -> MapExpr {
        let owner = registry.clone();
        let node = registry.intern(Key::Constant(value.clone()), move |key| {
            Node::new(Op::Constant(value), owner, Some(key))
        });
        MapExpr::from_node(node)
    }

    /// True for the null handle.
    pub fn is_null(&self) -> bool {
        self.node.is_none()
    }

    /// True when this node is a constant (including folded combinators).
    pub fn is_constant(&self) -> bool {
        matches!(self.node.as_deref(), Some(Node { op: Op::Constant(_), .. }))
    }

    /// True when this node is a settable variable leaf.
    pub fn is_variable(&self) -> bool {
        matches!(self.node.as_deref(), Some(Node { op: Op::Variable(_), .. }))
    }

    /// The static root-identity guarantee: true when every evaluation of
    /// this expression maps the absolute root to itself, regardless of
    /// variable values. Computed once at construction from the operator
    /// and the operands' static flags.
    pub fn always_has_root_identity(&self) -> bool {
        self.node
            .as_deref()
            .is_some_and(|n| n.always_root_identity)
    }

    /// Node-identity comparison; also available through `==`.
    pub fn ptr_eq(&self, other: &MapExpr) -> bool {
        match (&self.node, &other.node) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Evaluates the expression, returning the cached value when it is
    /// still valid. Evaluating the null handle is a contract violation and
    /// degrades to the empty function.
    pub fn evaluate(&self) -> MapFunction {
        match &self.node {
            Some(node) => node.evaluate(),
            None => {
                diagnostic::coding_error(&MapError::NullExpression);
                MapFunction::empty()
            }
        }
    }

    /// The inverse expression. Folds constants eagerly.
    pub fn inverse(&self) -> MapExpr {
        let Some(node) = &self.node else {
            diagnostic::coding_error(&MapError::NullExpression);
            return MapExpr::null();
        };
        if let Op::Constant(value) = &node.op {
            return Self::constant_in(node.registry(), value.inverse());
        }
        let owner = node.registry().clone();
        let operand = node.clone();
        let interned = node
            .registry()
            .intern(Key::Inverse(Arc::as_ptr(node) as usize), move |key| {
                Node::new(Op::Inverse(operand), owner, Some(key))
            });
        MapExpr::from_node(interned)
    }

    /// The composition "apply `inner` first, then `self`". Folds two
    /// constants eagerly. Both handles must belong to the same engine.
    pub fn compose(&self, inner: &MapExpr) -> MapExpr {
        let (Some(outer), Some(inner)) = (&self.node, &inner.node) else {
            diagnostic::coding_error(&MapError::NullExpression);
            return MapExpr::null();
        };
        if !Arc::ptr_eq(outer.registry(), inner.registry()) {
            diagnostic::coding_error(&MapError::ForeignExpression);
            return MapExpr::null();
        }
        if let (Op::Constant(a), Op::Constant(b)) = (&outer.op, &inner.op) {
            return Self::constant_in(outer.registry(), a.compose(b));
        }
        let owner = outer.registry().clone();
        let key = Key::Compose(
            Arc::as_ptr(outer) as usize,
            Arc::as_ptr(inner) as usize,
        );
        let (a, b) = (outer.clone(), inner.clone());
        let interned = outer
            .registry()
            .intern(key, move |key| Node::new(Op::Compose(a, b), owner, Some(key)));
        MapExpr::from_node(interned)
    }

    /// This expression plus the root identity. Folds constants eagerly and
    /// returns `self` unchanged when the static flag already guarantees the
    /// identity, so repeated application builds no redundant node.
    pub fn add_root_identity(&self) -> MapExpr {
        let Some(node) = &self.node else {
            diagnostic::coding_error(&MapError::NullExpression);
            return MapExpr::null();
        };
        if let Op::Constant(value) = &node.op {
            return Self::constant_in(node.registry(), value.with_root_identity());
        }
        if node.always_root_identity {
            return self.clone();
        }
        let owner = node.registry().clone();
        let operand = node.clone();
        let interned = node
            .registry()
            .intern(Key::AddRootIdentity(Arc::as_ptr(node) as usize), move |key| {
                Node::new(Op::AddRootIdentity(operand), owner, Some(key))
            });
        MapExpr::from_node(interned)
    }

    /// Whether a valid cached value is currently present. Diagnostic.
    pub fn has_cached_value(&self) -> bool {
        self.node.as_deref().is_some_and(Node::has_cached_value)
    }

    /// How many times this node's value has been (re)computed. Diagnostic;
    /// lets callers verify that no-op variable writes clear nothing.
    pub fn recompute_count(&self) -> u64 {
        self.node.as_deref().map_or(0, Node::recompute_count)
    }
}

impl PartialEq for MapExpr {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for MapExpr {}

impl std::hash::Hash for MapExpr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.node
            .as_ref()
            .map_or(std::ptr::null(), Arc::as_ptr)
            .hash(state);
    }
}

impl std::fmt::Debug for MapExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.node {
            None => write!(f, "MapExpr(null)"),
            Some(node) => {
                let kind = match &node.op {
                    Op::Constant(_) => "constant",
                    Op::Variable(_) => "variable",
                    Op::Inverse(_) => "inverse",
                    Op::Compose(..) => "compose",
                    Op::AddRootIdentity(_) => "add-root-identity",
                };
                write!(f, "MapExpr({kind} @ {:p})", Arc::as_ptr(node))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MapEngine;

    fn model_fn() -> MapFunction {
        MapFunction::from_pairs(&[("/Model", "/World/anim/Model_1")])
    }

    #[test]
    fn equal_combinator_chains_intern_to_one_node() {
        let engine = MapEngine::new();
        let a = engine.constant(model_fn()).inverse();
        let b = engine.constant(model_fn()).inverse();
        assert!(a.ptr_eq(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn variables_never_intern() {
        let engine = MapEngine::new();
        let (_va, ea) = engine.variable(model_fn());
        let (_vb, eb) = engine.variable(model_fn());
        assert!(!ea.ptr_eq(&eb));
        assert!(ea.is_variable());
    }

    #[test]
    fn constants_fold() {
        let engine = MapEngine::new();
        let f = model_fn();
        let g = MapFunction::from_pairs(&[("/Rig", "/Model/Rig")]);
        let composed = engine.constant(f.clone()).compose(&engine.constant(g.clone()));
        assert!(composed.is_constant());
        assert_eq!(composed.evaluate(), f.compose(&g));

        let inverted = engine.constant(f.clone()).inverse();
        assert!(inverted.is_constant());
        assert_eq!(inverted.evaluate(), f.inverse());
    }

    #[test]
    fn add_root_identity_is_idempotent_per_node() {
        let engine = MapEngine::new();
        let (_var, e) = engine.variable(model_fn());
        let once = e.add_root_identity();
        let twice = once.add_root_identity();
        assert!(once.ptr_eq(&twice));
        assert!(!once.ptr_eq(&e));
        assert!(once.always_has_root_identity());
    }

    #[test]
    fn compose_flag_is_a_conjunction() {
        let engine = MapEngine::new();
        // The variable's static flag is false even though its current value
        // has root identity; composing with the identity must not claim a
        // static guarantee it cannot keep across reassignment.
        let (_var, e) = engine.variable(MapFunction::identity());
        assert!(!e.always_has_root_identity());
        let composed = engine.identity().compose(&e);
        assert!(!composed.always_has_root_identity());
        // Every other combinator carries the flag through.
        assert!(composed.add_root_identity().inverse().always_has_root_identity());
    }

    #[test]
    fn evaluation_is_cached_until_invalidated() {
        let engine = MapEngine::new();
        let (var, e) = engine.variable(model_fn());
        let inv = e.inverse();
        assert_eq!(inv.evaluate(), model_fn().inverse());
        assert!(inv.has_cached_value());
        assert_eq!(inv.recompute_count(), 1);

        // Cache hit: no recompute.
        inv.evaluate();
        assert_eq!(inv.recompute_count(), 1);

        let edited = MapFunction::from_pairs(&[("/Model", "/World/anim/Model_2")]);
        var.set(edited.clone());
        assert!(!inv.has_cached_value());
        assert_eq!(inv.evaluate(), edited.inverse());
        assert_eq!(inv.recompute_count(), 2);
    }

    #[test]
    fn noop_set_clears_nothing() {
        let engine = MapEngine::new();
        let (var, e) = engine.variable(model_fn());
        let inv = e.inverse();
        inv.evaluate();
        var.set(model_fn());
        assert!(inv.has_cached_value());
        assert_eq!(inv.recompute_count(), 1);
    }

    #[test]
    fn invalidation_stops_at_clear_nodes() {
        let engine = MapEngine::new();
        let (var, e) = engine.variable(model_fn());
        let inv = e.inverse();
        let chained = inv.add_root_identity();
        chained.evaluate();
        assert!(inv.has_cached_value() && chained.has_cached_value());

        var.set(MapFunction::identity());
        assert!(!inv.has_cached_value() && !chained.has_cached_value());
        // Setting again while everything is clear is still fine.
        var.set(model_fn());
        assert_eq!(chained.evaluate(), model_fn().inverse().with_root_identity());
    }

    #[test]
    fn null_handle_operations_degrade() {
        let null = MapExpr::null();
        assert!(null.is_null());
        assert!(null.inverse().is_null());
        assert!(null.add_root_identity().is_null());
        assert!(null.evaluate().is_empty());
        assert_ne!(null, MapEngine::new().identity());
    }

    #[test]
    fn dropped_variable_freezes_its_value() {
        let engine = MapEngine::new();
        let (var, e) = engine.variable(model_fn());
        let inv = e.inverse();
        drop(var);
        assert_eq!(inv.evaluate(), model_fn().inverse());
        assert_eq!(e.evaluate(), model_fn());
    }

    #[test]
    fn interning_revives_after_drop() {
        let engine = MapEngine::new();
        let first = engine.constant(model_fn());
        let inv_a = first.inverse();
        drop(inv_a);
        // The node was deregistered; an equal chain builds a fresh one.
        let inv_b = first.inverse();
        assert_eq!(inv_b.evaluate(), model_fn().inverse());
    }
}
