//! Error types for attribute fetching.

use thiserror::Error;

/// Result alias for attribute fetch operations.
pub type AttributeResult<T> = Result<T, AttributeError>;

/// Failures reported by an [`crate::AttributeFetch`] implementation.
///
/// The resolver never propagates these: it logs them and treats the
/// requested attributes as unresolved.
#[derive(Debug, Error)]
pub enum AttributeError {
    /// The backing information source could not be reached or failed.
    #[error("attribute fetch failed: {reason}")]
    Fetch {
        /// Reason reported by the source.
        reason: String,
    },

    /// The source answered with a document the resolver cannot graft.
    #[error("malformed attribute response for `{key}`: {reason}")]
    Malformed {
        /// Request key the response was filed under.
        key: String,
        /// Description of the problem.
        reason: String,
    },
}

impl AttributeError {
    /// Convenience helper to construct fetch errors.
    #[must_use]
    pub fn fetch(reason: impl Into<String>) -> Self {
        Self::Fetch {
            reason: reason.into(),
        }
    }
}
