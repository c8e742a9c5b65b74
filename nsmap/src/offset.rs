//! Affine time offsets carried alongside the path map.
//!
//! A mapping function warps the time coordinate as well as the namespace:
//! `t' = t * scale + offset`. Offsets compose and invert together with the
//! path pairs, and participate in structural equality and hashing (via the
//! bit patterns of the two floats, so they are usable as intern-key parts).

use std::fmt;

use crate::diagnostic::{self, MapError};

/// An affine warp of the time coordinate.
#[derive(Clone, Copy, Debug)]
pub struct TimeOffset {
    scale: f64,
    offset: f64,
}

impl Default for TimeOffset {
    fn default() -> Self {
        Self::identity()
    }
}

impl TimeOffset {
    /// The identity warp: scale 1, offset 0.
    pub const fn identity() -> Self {
        TimeOffset { scale: 1.0, offset: 0.0 }
    }

    /// Builds a warp from a scale and an offset.
    ///
    /// A zero scale is not invertible and is a caller bug: it is reported
    /// as a coding error and degrades to the identity scale.
    pub fn new(scale: f64, offset: f64) -> Self {
        if scale == 0.0 {
            diagnostic::coding_error(&MapError::ZeroTimeScale);
            return TimeOffset { scale: 1.0, offset: canonical(offset) };
        }
        TimeOffset { scale: canonical(scale), offset: canonical(offset) }
    }

    /// The multiplicative part.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// The additive part.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Applies the warp to a time coordinate.
    pub fn apply(&self, time: f64) -> f64 {
        time * self.scale + self.offset
    }

    /// True for the identity warp.
    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }

    /// The warp applying `inner` first, then `self`.
    pub fn compose(&self, inner: &TimeOffset) -> TimeOffset {
        TimeOffset {
            scale: canonical(self.scale * inner.scale),
            offset: canonical(self.scale * inner.offset + self.offset),
        }
    }

    /// The inverse warp, mapping warped coordinates back.
    pub fn inverse(&self) -> TimeOffset {
        TimeOffset {
            scale: canonical(1.0 / self.scale),
            offset: canonical(-self.offset / self.scale),
        }
    }
}

/// Collapses -0.0 to 0.0 so bitwise equality and hashing stay consistent
/// with numeric equality.
fn canonical(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

impl PartialEq for TimeOffset {
    fn eq(&self, other: &Self) -> bool {
        self.scale.to_bits() == other.scale.to_bits()
            && self.offset.to_bits() == other.offset.to_bits()
    }
}

impl Eq for TimeOffset {}

impl std::hash::Hash for TimeOffset {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.scale.to_bits().hash(state);
        self.offset.to_bits().hash(state);
    }
}

impl fmt::Display for TimeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t*{}{:+}", self.scale, self.offset)
    }
}
