//! Expression node internals: the operator union, lazy evaluation with an
//! epoch-guarded cache, and transitive invalidation through weak dependent
//! back-references.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crossbeam::utils::Backoff;
use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

use crate::diagnostic::{self, MapError};
use crate::function::MapFunction;

use super::registry::{Key, Registry};

/// The five operators. Small, fixed, and hot-path, so a tagged union rather
/// than trait objects.
pub(crate) enum Op {
    Constant(MapFunction),
    Variable(RwLock<MapFunction>),
    Inverse(Arc<Node>),
    Compose(Arc<Node>, Arc<Node>),
    AddRootIdentity(Arc<Node>),
}

/// A node of the mapping-expression DAG.
///
/// Operands are strong references (children outlive parents); `dependents`
/// holds weak back-references used only to push invalidation upward. The
/// cached value is published under a read-write lock after being computed
/// with no locks held; `epoch` detects an invalidation that raced with an
/// in-flight computation so a stale value is never published.
pub(crate) struct Node {
    pub(crate) op: Op,
    pub(crate) always_root_identity: bool,
    registry: Arc<Registry>,
    key: Option<Key>,
    cache: RwLock<Option<MapFunction>>,
    epoch: AtomicU64,
    recomputes: AtomicU64,
    dependents: Mutex<SmallVec<[Weak<Node>; 4]>>,
}

impl Node {
    pub(crate) fn new(op: Op, registry: Arc<Registry>, key: Option<Key>) -> Node {
        let always_root_identity = match &op {
            Op::Constant(value) => value.has_root_identity(),
            // A variable's value can be reassigned, so nothing is static.
            Op::Variable(_) => false,
            Op::Inverse(a) => a.always_root_identity,
            // Composing through a side that does not preserve identity can
            // remove the pass-through, hence the conjunction.
            Op::Compose(a, b) => a.always_root_identity && b.always_root_identity,
            Op::AddRootIdentity(_) => true,
        };
        Node {
            op,
            always_root_identity,
            registry,
            key,
            cache: RwLock::new(None),
            epoch: AtomicU64::new(0),
            recomputes: AtomicU64::new(0),
            dependents: Mutex::new(SmallVec::new()),
        }
    }

    pub(crate) fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Registers `this` in each operand's dependent set. Must happen before
    /// the node becomes reachable by other threads, or an invalidation
    /// could miss it.
    pub(crate) fn attach_to_operands(this: &Arc<Node>) {
        for operand in this.operands() {
            operand.dependents.lock().push(Arc::downgrade(this));
        }
    }

    fn operands(&self) -> SmallVec<[&Arc<Node>; 2]> {
        match &self.op {
            Op::Constant(_) | Op::Variable(_) => SmallVec::new(),
            Op::Inverse(a) | Op::AddRootIdentity(a) => smallvec::smallvec![a],
            Op::Compose(a, b) => smallvec::smallvec![a, b],
        }
    }

    /// Returns the cached value, computing and publishing it if necessary.
    ///
    /// Computation holds no locks; concurrent redundant recomputation is
    /// permitted (it is deterministic and idempotent). Publication is
    /// withheld when the epoch moved underneath the computation, so an
    /// evaluation that raced with `set_variable_value` retries instead of
    /// caching a mix of old and new inputs.
    pub(crate) fn evaluate(&self) -> MapFunction {
        let backoff = Backoff::new();
        loop {
            if let Some(value) = &*self.cache.read() {
                return value.clone();
            }
            let epoch = self.epoch.load(Ordering::Acquire);
            let value = self.compute();
            let mut slot = self.cache.write();
            if self.epoch.load(Ordering::Acquire) == epoch {
                self.recomputes.fetch_add(1, Ordering::Relaxed);
                *slot = Some(value.clone());
                return value;
            }
            drop(slot);
            backoff.spin();
        }
    }

    fn compute(&self) -> MapFunction {
        match &self.op {
            Op::Constant(value) => value.clone(),
            Op::Variable(cell) => cell.read().clone(),
            Op::Inverse(a) => a.evaluate().inverse(),
            Op::Compose(a, b) => a.evaluate().compose(&b.evaluate()),
            Op::AddRootIdentity(a) => a.evaluate().with_root_identity(),
        }
    }

    pub(crate) fn has_cached_value(&self) -> bool {
        self.cache.read().is_some()
    }

    pub(crate) fn recompute_count(&self) -> u64 {
        self.recomputes.load(Ordering::Relaxed)
    }

    /// Reassigns a variable's value and invalidates every dependent cache.
    /// Setting the current value again is a no-op and clears nothing.
    pub(crate) fn set_variable_value(&self, value: MapFunction) {
        let Op::Variable(cell) = &self.op else {
            // Unreachable through the public API; factories are the only
            // path to node creation.
            diagnostic::coding_error(&MapError::NotAVariable);
            return;
        };
        {
            let mut current = cell.write();
            if *current == value {
                return;
            }
            *current = value;
        }
        self.clear_cache();
        self.invalidate_dependents();
    }

    pub(crate) fn variable_value(&self) -> Option<MapFunction> {
        match &self.op {
            Op::Variable(cell) => Some(cell.read().clone()),
            _ => None,
        }
    }

    /// Bumps the epoch (failing any in-flight publication) and drops the
    /// cached value. Returns whether a value was actually present.
    fn clear_cache(&self) -> bool {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.cache.write().take().is_some()
    }

    /// Clears dependent caches transitively, stopping at nodes that are
    /// already clear: a parent can only hold a cached value if its operands
    /// did, so a clear node's ancestors are clear as well.
    fn invalidate_dependents(&self) {
        let parents: SmallVec<[Arc<Node>; 4]> = {
            let dependents = self.dependents.lock();
            dependents.iter().filter_map(Weak::upgrade).collect()
        };
        for parent in parents {
            if parent.clear_cache() {
                parent.invalidate_dependents();
            }
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        let me = self as *const Node;
        for operand in self.operands() {
            operand
                .dependents
                .lock()
                .retain(|weak| !std::ptr::eq(weak.as_ptr(), me));
        }
        if let Some(key) = &self.key {
            self.registry.deregister(key, me);
        }
        // Dropping `op` now releases the operand references, which may
        // cascade further drops.
    }
}
