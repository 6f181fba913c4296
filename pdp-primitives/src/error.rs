//! Shared error definitions for policy primitives.

use thiserror::Error;

/// Result alias used throughout the decision point.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating primitive types or talking to
/// external collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// An attribute map document did not have the expected shape.
    #[error("invalid attribute map: {reason}")]
    InvalidAttributeMap {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// An element identifier could not be parsed.
    #[error("invalid element id `{id}`")]
    InvalidElementId {
        /// The offending identifier string.
        id: String,
    },

    /// An external collaborator (attribute fetch, policy retrieval, registry)
    /// reported a failure.
    #[error("collaborator failure: {reason}")]
    Collaborator {
        /// Human-readable context provided by the collaborator.
        reason: String,
    },
}

impl Error {
    /// Convenience helper to construct collaborator errors.
    #[must_use]
    pub fn collaborator(reason: impl Into<String>) -> Self {
        Self::Collaborator {
            reason: reason.into(),
        }
    }
}
