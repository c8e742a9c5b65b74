//! The engine instance owning an intern registry.

use std::sync::Arc;

use crate::expr::{MapExpr, MapVariable, Node, Op, Registry};
use crate::function::MapFunction;

/// One independent mapping-expression engine.
///
/// Every expression is created through an engine (directly, or derived from
/// handles the engine produced) and shares its intern registry. Engines are
/// fully independent: expressions from different engines never intern
/// together and must not be combined. The registry holds only weak entries,
/// so dropping the engine and every handle tears the whole DAG down.
///
/// All engine and expression operations are safe to call from parallel
/// composition workers.
pub struct MapEngine {
    registry: Arc<Registry>,
    identity: MapExpr,
}

impl MapEngine {
    pub fn new() -> MapEngine {
        let registry = Registry::new();
        let identity = MapExpr::constant_in(&registry, MapFunction::identity());
        MapEngine { registry, identity }
    }

    /// A constant expression. Equal values intern to the same node.
    pub fn constant(&self, value: MapFunction) -> MapExpr {
        MapExpr::constant_in(&self.registry, value)
    }

    /// The constant identity expression; one node per engine.
    pub fn identity(&self) -> MapExpr {
        self.identity.clone()
    }

    /// Creates a settable variable with an initial value, returning the
    /// owning handle and the expression view of the variable.
    ///
    /// Variables are never interned: every call creates a distinct cell,
    /// even for equal initial values.
    pub fn variable(&self, initial: MapFunction) -> (MapVariable, MapExpr) {
        let node = Arc::new(Node::new(
            Op::Variable(parking_lot::RwLock::new(initial)),
            self.registry.clone(),
            None,
        ));
        let handle = MapVariable { node: node.clone() };
        (handle, MapExpr::from_node(node))
    }

    /// Number of live interned nodes. Diagnostic.
    pub fn interned_count(&self) -> usize {
        self.registry.len()
    }
}

impl Default for MapEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engines_are_independent() {
        let a = MapEngine::new();
        let b = MapEngine::new();
        let f = MapFunction::from_pairs(&[("/M", "/W/M")]);
        let ea = a.constant(f.clone());
        let eb = b.constant(f);
        assert!(!ea.ptr_eq(&eb));
        // Cross-engine composition degrades to the null handle.
        assert!(ea.compose(&eb).is_null());
    }

    #[test]
    fn identity_is_one_node_per_engine() {
        let engine = MapEngine::new();
        assert!(engine.identity().ptr_eq(&engine.identity()));
        assert!(engine
            .constant(MapFunction::identity())
            .ptr_eq(&engine.identity()));
    }

    #[test]
    fn registry_tears_down_with_handles() {
        let engine = MapEngine::new();
        let base = engine.interned_count();
        let e = engine.constant(MapFunction::from_pairs(&[("/A", "/B")]));
        let inv = e.inverse();
        assert_eq!(engine.interned_count(), base + 2);
        drop(inv);
        assert_eq!(engine.interned_count(), base + 1);
        drop(e);
        assert_eq!(engine.interned_count(), base);
    }
}
