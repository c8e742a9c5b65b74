//! Non-fatal diagnostic side channel.
//!
//! Contract violations never panic and never abort a composition pass: the
//! offending call degrades to a no-op or sentinel result and the violation is
//! reported here. Domain-restriction failures (a path outside a function's
//! domain) are *not* diagnostics; they are ordinary sentinel returns.

use nspath::{PathError, ScenePath};
use thiserror::Error;

/// A programmer-contract violation observed by the mapping layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    /// A mapping pair used a path that is not a well-formed absolute path.
    #[error("invalid mapping path: {0}")]
    InvalidPath(#[from] PathError),

    /// Mapping functions never encode variant selections; a pair carrying
    /// one was dropped.
    #[error("mapping path '{0}' must not contain variant selections")]
    VariantSelection(ScenePath),

    /// A mapping pair used the empty-path sentinel as an endpoint.
    #[error("mapping pair endpoints must be non-empty")]
    EmptyPair,

    /// A time offset with scale 0 is not invertible.
    #[error("time offset scale must be non-zero")]
    ZeroTimeScale,

    /// Expressions from two different engines were combined.
    #[error("cannot combine expressions owned by different engines")]
    ForeignExpression,

    /// An operation was applied to the null expression handle.
    #[error("operation on a null mapping expression")]
    NullExpression,

    /// A value was assigned to an expression that is not a variable.
    #[error("cannot assign a value to a non-variable expression")]
    NotAVariable,
}

/// Reports a contract violation. The caller is expected to degrade to a
/// sentinel result after calling this.
pub(crate) fn coding_error(err: &MapError) {
    log::error!(target: "nsmap", "coding error: {err}");
}
