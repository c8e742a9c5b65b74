//! Absolute scene paths with componentwise prefix algebra.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

/// Error raised when a string does not denote a well-formed absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The string does not begin with `/`.
    #[error("path '{0}' is not absolute")]
    NotAbsolute(String),

    /// Two adjacent separators, or a trailing separator, produced an empty
    /// component.
    #[error("path '{0}' contains an empty component")]
    EmptyComponent(String),

    /// A variant selection suffix is malformed (unbalanced braces or a
    /// missing `set=sel` form).
    #[error("path '{0}' has a malformed variant selection")]
    MalformedSelection(String),
}

/// An absolute path into the scene namespace.
///
/// The representation is a normalized `/`-separated string behind an
/// `Arc<str>`, so clones are reference bumps and equality/ordering/hashing
/// are structural. Two sentinels exist besides ordinary prim paths:
///
/// - the **absolute root** `/`, parent of every other path;
/// - the **empty path** (`ScenePath::default()`), the "unmapped" sentinel
///   returned when a path falls outside a mapping function's domain.
///
/// Components may carry variant selections, written `{set=sel}` after the
/// component name. Mapping functions never encode selections; the
/// translation layer strips and re-patches them.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScenePath {
    repr: Arc<str>,
}

impl Default for ScenePath {
    fn default() -> Self {
        ScenePath { repr: Arc::from("") }
    }
}

impl ScenePath {
    /// The empty (unmapped) path sentinel.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The absolute root path `/`.
    pub fn absolute_root() -> Self {
        ScenePath { repr: Arc::from("/") }
    }

    /// Parses and validates an absolute path string.
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if s.is_empty() {
            return Ok(Self::empty());
        }
        if !s.starts_with('/') {
            return Err(PathError::NotAbsolute(s.to_owned()));
        }
        if s == "/" {
            return Ok(Self::absolute_root());
        }
        for component in s[1..].split('/') {
            if component.is_empty() {
                return Err(PathError::EmptyComponent(s.to_owned()));
            }
            validate_component(component).map_err(|_| {
                PathError::MalformedSelection(s.to_owned())
            })?;
        }
        Ok(ScenePath { repr: Arc::from(s) })
    }

    /// Returns true for the empty (unmapped) sentinel.
    pub fn is_empty(&self) -> bool {
        self.repr.is_empty()
    }

    /// Returns true for the absolute root `/`.
    pub fn is_absolute_root(&self) -> bool {
        &*self.repr == "/"
    }

    /// The path components, in order, without the leading separator.
    ///
    /// The root and empty paths have no components.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        let body = if self.repr.len() <= 1 { "" } else { &self.repr[1..] };
        body.split('/').filter(|c| !c.is_empty())
    }

    /// Number of components; the root and empty paths have depth 0.
    pub fn depth(&self) -> usize {
        self.components().count()
    }

    /// The parent path, or `None` for the root and empty paths.
    pub fn parent(&self) -> Option<ScenePath> {
        if self.repr.len() <= 1 {
            return None;
        }
        match self.repr.rfind('/') {
            Some(0) => Some(Self::absolute_root()),
            Some(idx) => Some(ScenePath { repr: Arc::from(&self.repr[..idx]) }),
            None => None,
        }
    }

    /// Appends a child component. The component must be non-empty and free
    /// of separators; violations are a caller bug.
    pub fn child(&self, name: &str) -> ScenePath {
        debug_assert!(!name.is_empty() && !name.contains('/'));
        if self.is_empty() {
            return self.clone();
        }
        let mut s = String::with_capacity(self.repr.len() + name.len() + 1);
        if !self.is_absolute_root() {
            s.push_str(&self.repr);
        }
        s.push('/');
        s.push_str(name);
        ScenePath { repr: Arc::from(s.as_str()) }
    }

    /// Appends a variant selection `{set=sel}` to the final component.
    ///
    /// Has no effect on the empty or root paths.
    pub fn with_variant_selection(&self, set: &str, sel: &str) -> ScenePath {
        if self.repr.len() <= 1 {
            return self.clone();
        }
        let mut s = String::with_capacity(self.repr.len() + set.len() + sel.len() + 3);
        s.push_str(&self.repr);
        s.push('{');
        s.push_str(set);
        s.push('=');
        s.push_str(sel);
        s.push('}');
        ScenePath { repr: Arc::from(s.as_str()) }
    }

    /// Returns true if any component carries a variant selection.
    pub fn contains_variant_selections(&self) -> bool {
        self.repr.contains('{')
    }

    /// Removes every variant selection, leaving the plain prim path.
    pub fn strip_variant_selections(&self) -> ScenePath {
        if !self.contains_variant_selections() {
            return self.clone();
        }
        let mut s = String::with_capacity(self.repr.len());
        let mut in_selection = false;
        for ch in self.repr.chars() {
            match ch {
                '{' => in_selection = true,
                '}' => in_selection = false,
                c if !in_selection => s.push(c),
                _ => {}
            }
        }
        ScenePath { repr: Arc::from(s.as_str()) }
    }

    /// Componentwise prefix test: `/Model` is a prefix of `/Model/Rig` and
    /// of itself, but not of `/ModelX`. The root is a prefix of every
    /// non-empty path; the empty path prefixes nothing and has no prefixes.
    pub fn has_prefix(&self, prefix: &ScenePath) -> bool {
        if self.is_empty() || prefix.is_empty() {
            return false;
        }
        if prefix.is_absolute_root() {
            return true;
        }
        let (a, b) = (&*self.repr, &*prefix.repr);
        a == b || (a.len() > b.len() && a.starts_with(b) && a.as_bytes()[b.len()] == b'/')
    }

    /// Rewrites the `old` prefix of this path to `new`, keeping the
    /// remainder. Returns `None` when `old` is not a prefix of this path
    /// or when either replacement end is the empty sentinel.
    pub fn replace_prefix(&self, old: &ScenePath, new: &ScenePath) -> Option<ScenePath> {
        if new.is_empty() || !self.has_prefix(old) {
            return None;
        }
        let remainder = if old.is_absolute_root() {
            &self.repr[..]
        } else {
            &self.repr[old.repr.len()..]
        };
        // remainder is "" (exact match) or "/..." in both branches, except
        // that a root old leaves the full "/..." body.
        if remainder.is_empty() || remainder == "/" {
            return Some(new.clone());
        }
        let mut s = String::with_capacity(new.repr.len() + remainder.len());
        if !new.is_absolute_root() {
            s.push_str(&new.repr);
        }
        s.push_str(remainder);
        Some(ScenePath { repr: Arc::from(s.as_str()) })
    }

    /// The underlying normalized string.
    pub fn as_str(&self) -> &str {
        &self.repr
    }
}

fn validate_component(component: &str) -> Result<(), ()> {
    // Component shape: name, then zero or more "{set=sel}" suffixes.
    let (name, rest) = match component.find('{') {
        Some(idx) => component.split_at(idx),
        None => (component, ""),
    };
    if name.is_empty() {
        return Err(());
    }
    let mut rest = rest;
    while !rest.is_empty() {
        if !rest.starts_with('{') {
            return Err(());
        }
        let close = rest.find('}').ok_or(())?;
        let body = &rest[1..close];
        let eq = body.find('=').ok_or(())?;
        if eq == 0 {
            return Err(());
        }
        rest = &rest[close + 1..];
    }
    Ok(())
}

impl AsRef<str> for ScenePath {
    fn as_ref(&self) -> &str {
        &self.repr
    }
}

impl FromStr for ScenePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "<empty>")
        } else {
            f.write_str(&self.repr)
        }
    }
}

impl fmt::Debug for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScenePath({})", self)
    }
}
