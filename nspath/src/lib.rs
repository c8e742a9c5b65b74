//! Scene-namespace path values for the composition engine.
//!
//! A [`ScenePath`] names a location in a composed scene: always absolute,
//! `/`-separated, with optional variant selections (`/Model{lod=high}/Rig`)
//! attached to individual components. Paths are immutable and cheap to clone;
//! the prefix algebra (`has_prefix`, `replace_prefix`) is what the mapping
//! layer builds on.

pub mod path;

pub use path::{PathError, ScenePath};
