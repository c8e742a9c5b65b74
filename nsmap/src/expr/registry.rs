//! Interning registry for expression nodes.
//!
//! Non-variable nodes are canonicalized: building the same operator over the
//! same operand identities (or the same constant value) yields the same node
//! while any reference to it is live. The registry holds weak references
//! only; node drop removes the entry, so an engine tears down cleanly when
//! the last expression goes away.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::function::MapFunction;

use super::node::Node;

/// Structural identity of a non-variable node: operator, operand node
/// addresses, and the constant payload. Variables are never interned.
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) enum Key {
    Constant(MapFunction),
    Inverse(usize),
    Compose(usize, usize),
    AddRootIdentity(usize),
}

/// One engine's intern table, shared by every node the engine creates.
pub(crate) struct Registry {
    map: DashMap<Key, Weak<Node>>,
}

impl Registry {
    pub(crate) fn new() -> Arc<Registry> {
        Arc::new(Registry { map: DashMap::new() })
    }

    /// Looks up `key`, returning the canonical node if one is alive.
    ///
    /// A present-but-dead entry means the previous holder's last reference
    /// is mid-drop on another thread; the entry is replaced with a fresh
    /// node and the dying node's deregistration (which compares addresses)
    /// will leave the replacement alone.
    pub(crate) fn intern(&self, key: Key, build: impl FnOnce(Key) -> Node) -> Arc<Node> {
        match self.map.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if let Some(existing) = entry.get().upgrade() {
                    return existing;
                }
                let node = Arc::new(build(key));
                Node::attach_to_operands(&node);
                entry.insert(Arc::downgrade(&node));
                node
            }
            Entry::Vacant(entry) => {
                let node = Arc::new(build(key));
                Node::attach_to_operands(&node);
                entry.insert(Arc::downgrade(&node));
                node
            }
        }
    }

    /// Removes `key` only while it still refers to the node at `ptr`.
    /// Called from node drop; a concurrent replacement must survive.
    pub(crate) fn deregister(&self, key: &Key, ptr: *const Node) {
        self.map.remove_if(key, |_, weak| std::ptr::eq(weak.as_ptr(), ptr));
    }

    /// Number of live interned nodes (dead entries pending removal count
    /// until their drop completes).
    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}
