//! Errors surfaced by the decision engine.

use pdp_primitives::ValidationError;
use thiserror::Error;

/// Result alias for engine operations.
pub type PdpResult<T> = Result<T, PdpError>;

/// Failures that escape the decision pipeline.
///
/// Everything that goes wrong while evaluating a request (missing
/// attributes, expression faults, unregistered handlers) collapses into
/// [`pdp_primitives::Decision::Indeterminate`] instead.
#[derive(Debug, Error)]
pub enum PdpError {
    /// A decision was requested before a successful bootstrap.
    #[error("policy decision point is not bootstrapped")]
    NotBootstrapped,

    /// One or more registry records failed normalization.
    #[error("bootstrap failed with {} validation error(s): {}", errors.len(), summarize(errors))]
    Bootstrap {
        /// Every problem collected across all registry records.
        errors: Vec<ValidationError>,
    },

    /// The registry collaborator could not list its records.
    #[error("registry retrieval failed: {reason}")]
    Registry {
        /// Reason reported by the collaborator.
        reason: String,
    },

    /// The policy retrieval collaborator failed.
    #[error("policy retrieval failed: {reason}")]
    Retrieval {
        /// Reason reported by the collaborator.
        reason: String,
    },

    /// The builder was missing a required collaborator.
    #[error("missing collaborator: {name}")]
    MissingCollaborator {
        /// Name of the builder slot left empty.
        name: &'static str,
    },
}

impl PdpError {
    /// Convenience helper to construct retrieval errors.
    #[must_use]
    pub fn retrieval(reason: impl Into<String>) -> Self {
        Self::Retrieval {
            reason: reason.into(),
        }
    }

    /// Convenience helper to construct registry errors.
    #[must_use]
    pub fn registry(reason: impl Into<String>) -> Self {
        Self::Registry {
            reason: reason.into(),
        }
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
