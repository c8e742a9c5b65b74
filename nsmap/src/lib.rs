//! Namespace-mapping expression engine for hierarchical scene composition.
//!
//! Every arc of a composition graph carries a *mapping function*: a
//! bijective partial path→path map plus a time offset, translating authored
//! values and dependent paths across the arc. The function for a node deep
//! in the graph is the composition of every arc's function up to the root.
//! This crate provides:
//!
//! - [`MapFunction`] — the immutable mapping-function value and its algebra
//!   (compose, inverse, root identity);
//! - [`MapExpr`] / [`MapVariable`] / [`MapEngine`] — an interned, lazily
//!   evaluated expression DAG over those values, with transitive cache
//!   invalidation when a variable input (e.g. a relocation edit) changes;
//! - [`translate`] — application of an evaluated mapping to concrete paths,
//!   embedded targets included, all-or-nothing.
//!
//! Everything is safe under parallel composition workers; see the module
//! docs for the specific protocols. No operation blocks on I/O or throws:
//! domain failures are sentinels, contract violations degrade to no-ops and
//! are reported through the [`diagnostic`] side channel.

pub mod diagnostic;
pub mod engine;
pub mod expr;
pub mod function;
pub mod offset;
pub mod translate;

pub use diagnostic::MapError;
pub use engine::MapEngine;
pub use expr::{MapExpr, MapVariable};
pub use function::{MapFunction, PathPair};
pub use offset::TimeOffset;
pub use translate::{
    MappedNode, translate_targets_to_node, translate_targets_to_root, translate_to_node,
    translate_to_root,
};

pub use nspath::{PathError, ScenePath};
