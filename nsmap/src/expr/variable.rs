//! The mutable expression leaf.

use std::sync::Arc;

use crate::function::MapFunction;

use super::MapExpr;
use super::node::Node;

/// Owning handle for a variable expression.
///
/// A variable is the one mutable leaf of the DAG: reassigning it invalidates
/// the cache of every expression built over it. Variables are never
/// interned; each call to [`MapEngine::variable`](crate::MapEngine::variable)
/// creates a distinct settable cell, even for equal initial values.
///
/// Dropping the handle freezes the variable: expressions that reference it
/// keep evaluating with the last value, but no further mutation is possible
/// (the handle is the only way to call [`set`](Self::set)).
pub struct MapVariable {
    pub(crate) node: Arc<Node>,
}

impl MapVariable {
    /// The current value.
    pub fn get(&self) -> MapFunction {
        // The node is a variable by construction.
        self.node.variable_value().unwrap_or_else(MapFunction::empty)
    }

    /// Reassigns the value and invalidates dependent caches transitively.
    ///
    /// Assigning the current value again is a no-op: no cache is cleared
    /// and no invalidation propagates.
    pub fn set(&self, value: MapFunction) {
        self.node.set_variable_value(value);
    }

    /// An expression handle evaluating to this variable's current value.
    pub fn expression(&self) -> MapExpr {
        MapExpr::from_node(self.node.clone())
    }
}

impl std::fmt::Debug for MapVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MapVariable({})", self.get())
    }
}
