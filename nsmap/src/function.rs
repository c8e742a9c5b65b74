//! The bijective namespace-mapping value type.
//!
//! A [`MapFunction`] is an immutable, partial, bijective path→path map plus a
//! [`TimeOffset`]. Its domain is the union of the source subtrees of its
//! pairs; lookups rewrite the most specific matching prefix. The root
//! identity ("`/` maps to itself, unmatched paths pass through") is stored as
//! a separate flag so identity-preserving functions stay cheap and
//! `is_identity` is O(1).
//!
//! Values are held behind an `Arc`, so clones — which the expression cache
//! hands out constantly — are reference bumps. Equality and hashing are
//! structural over (pairs, root-identity flag, time offset), which is what
//! the intern registry keys on.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use nspath::ScenePath;
use once_cell::sync::Lazy;
use smallvec::SmallVec;

use crate::diagnostic::{self, MapError};
use crate::offset::TimeOffset;

/// One source→target correspondence; the pair maps the whole source subtree.
pub type PathPair = (ScenePath, ScenePath);

#[derive(Debug, PartialEq, Eq, Hash)]
struct MapData {
    /// Canonically ordered by source path; unique sources and targets; no
    /// pair redundant with its nearest covering pair.
    pairs: SmallVec<[PathPair; 4]>,
    has_root_identity: bool,
    time_offset: TimeOffset,
}

/// An immutable bijective partial path map with a time offset.
#[derive(Clone)]
pub struct MapFunction {
    data: Arc<MapData>,
}

static IDENTITY: Lazy<MapFunction> = Lazy::new(|| MapFunction {
    data: Arc::new(MapData {
        pairs: SmallVec::new(),
        has_root_identity: true,
        time_offset: TimeOffset::identity(),
    }),
});

static EMPTY: Lazy<MapFunction> = Lazy::new(|| MapFunction {
    data: Arc::new(MapData {
        pairs: SmallVec::new(),
        has_root_identity: false,
        time_offset: TimeOffset::identity(),
    }),
});

impl MapFunction {
    /// The identity function: maps every path (and time) to itself.
    pub fn identity() -> MapFunction {
        IDENTITY.clone()
    }

    /// The empty function: maps nothing. This is the sentinel for "no
    /// mapping exists", mirroring the empty path for single lookups.
    pub fn empty() -> MapFunction {
        EMPTY.clone()
    }

    /// Builds a function from source→target pairs and a time offset.
    ///
    /// Pairs are normalized: a literal `/ → /` pair becomes the root-identity
    /// flag, pairs conflicting with an earlier source or target are silently
    /// dropped (first wins), and pairs implied by a covering pair are
    /// removed. Endpoints must be plain absolute paths; a pair with an
    /// empty, relative, or variant-selection-bearing endpoint is a contract
    /// violation reported as a coding error and dropped.
    pub fn new<I>(pairs: I, time_offset: TimeOffset) -> MapFunction
    where
        I: IntoIterator<Item = PathPair>,
    {
        let mut accepted: Vec<PathPair> = Vec::new();
        let mut has_root_identity = false;
        for (source, target) in pairs {
            if source.is_empty() || target.is_empty() {
                diagnostic::coding_error(&MapError::EmptyPair);
                continue;
            }
            if source.contains_variant_selections() {
                diagnostic::coding_error(&MapError::VariantSelection(source));
                continue;
            }
            if target.contains_variant_selections() {
                diagnostic::coding_error(&MapError::VariantSelection(target));
                continue;
            }
            if source.is_absolute_root() && target.is_absolute_root() {
                has_root_identity = true;
                continue;
            }
            accepted.push((source, target));
        }
        Self::normalized(accepted, has_root_identity, time_offset)
    }

    /// Convenience constructor for string pairs, mostly for tests and
    /// diagnostics. Malformed paths are coding errors and are dropped.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> MapFunction {
        let parsed = pairs.iter().filter_map(|(s, t)| {
            let source = match ScenePath::parse(s) {
                Ok(p) => p,
                Err(e) => {
                    diagnostic::coding_error(&MapError::InvalidPath(e));
                    return None;
                }
            };
            let target = match ScenePath::parse(t) {
                Ok(p) => p,
                Err(e) => {
                    diagnostic::coding_error(&MapError::InvalidPath(e));
                    return None;
                }
            };
            Some((source, target))
        });
        Self::new(parsed.collect::<Vec<_>>(), TimeOffset::identity())
    }

    fn normalized(
        pairs: Vec<PathPair>,
        has_root_identity: bool,
        time_offset: TimeOffset,
    ) -> MapFunction {
        // First-wins uniqueness on both ends keeps the map bijective.
        let mut unique: Vec<PathPair> = Vec::with_capacity(pairs.len());
        for (source, target) in pairs {
            let conflict = unique
                .iter()
                .any(|(s, t)| *s == source || *t == target);
            if !conflict {
                unique.push((source, target));
            }
        }
        unique.sort_by(|a, b| a.0.cmp(&b.0));

        // Drop pairs already implied by their nearest covering pair (or by
        // the root identity when nothing covers them). Redundancy via the
        // longest-prefix rule is transitive, so one simultaneous sweep is
        // enough.
        let kept: SmallVec<[PathPair; 4]> = unique
            .iter()
            .filter(|(source, target)| {
                let implied = lookup(
                    unique.iter().filter(|(s, _)| s != source),
                    has_root_identity,
                    source,
                    |pair| (&pair.0, &pair.1),
                );
                implied != *target
            })
            .cloned()
            .collect();

        if kept.is_empty() && has_root_identity && time_offset.is_identity() {
            return Self::identity();
        }
        MapFunction {
            data: Arc::new(MapData { pairs: kept, has_root_identity, time_offset }),
        }
    }

    /// True only for the identity function. O(1).
    pub fn is_identity(&self) -> bool {
        self.data.has_root_identity
            && self.data.pairs.is_empty()
            && self.data.time_offset.is_identity()
    }

    /// True for the empty function, which maps nothing.
    pub fn is_empty(&self) -> bool {
        !self.data.has_root_identity && self.data.pairs.is_empty()
    }

    /// Whether unmatched paths pass through unchanged (the root maps to
    /// itself).
    pub fn has_root_identity(&self) -> bool {
        self.data.has_root_identity
    }

    /// The canonically ordered mapping pairs. The root-identity behavior is
    /// *not* represented here; see [`has_root_identity`](Self::has_root_identity).
    pub fn pairs(&self) -> &[PathPair] {
        &self.data.pairs
    }

    /// The time warp applied alongside the path map.
    pub fn time_offset(&self) -> TimeOffset {
        self.data.time_offset
    }

    /// Maps a path from the source namespace to the target namespace.
    ///
    /// The most specific pair whose source is a prefix of `path` rewrites
    /// that prefix. Unmatched paths pass through unchanged when the function
    /// has root identity and map to the empty path otherwise.
    pub fn source_to_target(&self, path: &ScenePath) -> ScenePath {
        lookup(
            self.data.pairs.iter(),
            self.data.has_root_identity,
            path,
            |pair| (&pair.0, &pair.1),
        )
    }

    /// Maps a path from the target namespace back to the source namespace.
    pub fn target_to_source(&self, path: &ScenePath) -> ScenePath {
        lookup(
            self.data.pairs.iter(),
            self.data.has_root_identity,
            path,
            |pair| (&pair.1, &pair.0),
        )
    }

    /// The composition "apply `inner` first, then `self`".
    ///
    /// The result's domain is the intersection of `inner`'s domain with the
    /// pullback of `self`'s domain; its root identity holds only when both
    /// inputs have it (identity pass-through does not survive composition
    /// through a non-identity-preserving side). Composing two identities
    /// yields the identity singleton.
    pub fn compose(&self, inner: &MapFunction) -> MapFunction {
        if self.is_identity() && inner.is_identity() {
            return Self::identity();
        }
        let mut pairs: Vec<PathPair> = Vec::with_capacity(
            self.data.pairs.len() + inner.data.pairs.len(),
        );
        // Push inner's pairs forward through self.
        for (source, target) in inner.data.pairs.iter() {
            let mapped = self.source_to_target(target);
            if !mapped.is_empty() {
                pairs.push((source.clone(), mapped));
            }
        }
        // Pull self's pair sources back through inner, then map the whole
        // chain, so domain refinements on the outer side survive.
        for (source, _) in self.data.pairs.iter() {
            let pulled = inner.target_to_source(source);
            if pulled.is_empty() {
                continue;
            }
            let through = inner.source_to_target(&pulled);
            if through.is_empty() {
                continue;
            }
            let mapped = self.source_to_target(&through);
            if !mapped.is_empty() {
                pairs.push((pulled, mapped));
            }
        }
        Self::normalized(
            pairs,
            self.data.has_root_identity && inner.data.has_root_identity,
            self.data.time_offset.compose(&inner.data.time_offset),
        )
    }

    /// The inverse function: pairs swapped, root identity preserved, time
    /// offset inverted. `f.inverse().inverse() == f` on the restricted
    /// domain (and structurally, given canonical normalization).
    pub fn inverse(&self) -> MapFunction {
        if self.is_identity() {
            return Self::identity();
        }
        let swapped = self
            .data
            .pairs
            .iter()
            .map(|(s, t)| (t.clone(), s.clone()))
            .collect();
        Self::normalized(
            swapped,
            self.data.has_root_identity,
            self.data.time_offset.inverse(),
        )
    }

    /// This function plus the root identity: unmatched paths now pass
    /// through. Returns `self` unchanged when the flag is already set.
    pub fn with_root_identity(&self) -> MapFunction {
        if self.data.has_root_identity {
            return self.clone();
        }
        Self::normalized(
            self.data.pairs.to_vec(),
            true,
            self.data.time_offset,
        )
    }

    /// Diagnostic rendering, e.g. `( /Model -> /World/Model_1, / -> / )`.
    pub fn pretty(&self) -> String {
        self.to_string()
    }
}

/// Most-specific-prefix lookup over an arbitrary pair orientation.
fn lookup<'a, I, P, F>(
    pairs: I,
    has_root_identity: bool,
    path: &ScenePath,
    orient: F,
) -> ScenePath
where
    I: Iterator<Item = &'a P>,
    P: 'a,
    F: Fn(&'a P) -> (&'a ScenePath, &'a ScenePath),
{
    if path.is_empty() {
        return ScenePath::empty();
    }
    let mut best: Option<(&ScenePath, &ScenePath)> = None;
    for pair in pairs {
        let (from, to) = orient(pair);
        if path.has_prefix(from)
            && best.map_or(true, |(b, _)| from.depth() > b.depth())
        {
            best = Some((from, to));
        }
    }
    match best {
        Some((from, to)) => path
            .replace_prefix(from, to)
            .unwrap_or_else(ScenePath::empty),
        None if has_root_identity => path.clone(),
        None => ScenePath::empty(),
    }
}

impl PartialEq for MapFunction {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data) || self.data == other.data
    }
}

impl Eq for MapFunction {}

impl Hash for MapFunction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.hash(state);
    }
}

impl fmt::Display for MapFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        let mut sep = " ";
        if self.data.has_root_identity {
            write!(f, "{sep}/ -> /")?;
            sep = ", ";
        }
        for (source, target) in self.data.pairs.iter() {
            write!(f, "{sep}{source} -> {target}")?;
            sep = ", ";
        }
        write!(f, " )")?;
        if !self.data.time_offset.is_identity() {
            write!(f, " @ {}", self.data.time_offset)?;
        }
        Ok(())
    }
}

impl fmt::Debug for MapFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MapFunction{self}")
    }
}
