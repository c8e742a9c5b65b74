//! Path translation between a node's namespace and the root namespace.
//!
//! The composition graph attaches a root-mapping expression to each of its
//! nodes; this module applies the evaluated function to concrete paths.
//! Mapping functions never encode variant selections; the selections chosen
//! along the arcs live on the node side (a variant arc maps identically
//! apart from the selection). Translation toward the root strips them before
//! mapping, and translation toward the node patches them back using the
//! node's selection-bearing site path.
//!
//! Failure to map is a sentinel (empty path / `None`), never an error: a
//! path outside the function's domain simply does not exist on the other
//! side of the arc.

use nspath::ScenePath;

use crate::expr::MapExpr;

/// What the composition graph must expose about a node for translation.
pub trait MappedNode {
    /// The accumulated expression mapping this node's namespace to the
    /// root namespace.
    fn map_to_root(&self) -> &MapExpr;

    /// This node's path in its own namespace. May carry the variant
    /// selections chosen between the root and this node.
    fn site_path(&self) -> &ScenePath;
}

/// Translates a path in `node`'s namespace to the root namespace.
///
/// Variant selections on the incoming path are stripped first; they are a
/// node-namespace artifact that mapping functions never encode. Returns the
/// empty path when `path` is outside the mapping's domain.
pub fn translate_to_root<N: MappedNode>(node: &N, path: &ScenePath) -> ScenePath {
    let function = node.map_to_root().evaluate();
    function.source_to_target(&path.strip_variant_selections())
}

/// Translates a root-namespace path into `node`'s namespace.
///
/// The mapped result is re-decorated with the variant selections present on
/// the node's site path (mapping-function sources are selection-free, so the
/// raw mapped path comes back undecorated). Returns the empty path when the
/// path does not map onto the node.
pub fn translate_to_node<N: MappedNode>(node: &N, path: &ScenePath) -> ScenePath {
    let function = node.map_to_root().evaluate();
    let mapped = function.target_to_source(path);
    if mapped.is_empty() {
        return mapped;
    }
    patch_variant_selections(node, mapped)
}

/// Translates a primary path together with its embedded target paths
/// (relationship targets, attribute connections) from `node`'s namespace to
/// the root namespace.
///
/// All-or-nothing: if the primary path or any embedded target fails to map,
/// the whole translation fails and `None` is returned. Partial substitution
/// would silently corrupt the composed value.
pub fn translate_targets_to_root<N: MappedNode>(
    node: &N,
    primary: &ScenePath,
    targets: &[ScenePath],
) -> Option<(ScenePath, Vec<ScenePath>)> {
    let function = node.map_to_root().evaluate();
    let mapped = function.source_to_target(&primary.strip_variant_selections());
    if mapped.is_empty() {
        return None;
    }
    let mut mapped_targets = Vec::with_capacity(targets.len());
    for target in targets {
        let mapped_target = function.source_to_target(&target.strip_variant_selections());
        if mapped_target.is_empty() {
            return None;
        }
        mapped_targets.push(mapped_target);
    }
    Some((mapped, mapped_targets))
}

/// Root-namespace counterpart of [`translate_targets_to_root`].
pub fn translate_targets_to_node<N: MappedNode>(
    node: &N,
    primary: &ScenePath,
    targets: &[ScenePath],
) -> Option<(ScenePath, Vec<ScenePath>)> {
    let function = node.map_to_root().evaluate();
    let mapped = function.target_to_source(primary);
    if mapped.is_empty() {
        return None;
    }
    let mut mapped_targets = Vec::with_capacity(targets.len());
    for target in targets {
        let mapped_target = function.target_to_source(target);
        if mapped_target.is_empty() {
            return None;
        }
        mapped_targets.push(patch_variant_selections(node, mapped_target));
    }
    Some((patch_variant_selections(node, mapped), mapped_targets))
}

/// Re-applies the node's variant selections to a freshly mapped node path
/// by rewriting the selection-stripped prefix to the selection-bearing one.
fn patch_variant_selections<N: MappedNode>(node: &N, mapped: ScenePath) -> ScenePath {
    let decorated = node.site_path();
    if !decorated.contains_variant_selections() {
        return mapped;
    }
    let stripped = decorated.strip_variant_selections();
    mapped
        .replace_prefix(&stripped, decorated)
        .unwrap_or(mapped)
}
