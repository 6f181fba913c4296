//! Compile-time and evaluation-time errors.

use serde_json::Value;
use thiserror::Error;

/// Result alias for compilation operations.
pub type LanguageResult<T> = Result<T, LanguageError>;

/// Errors raised while compiling an expression string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LanguageError {
    /// The source is not a valid CEL expression.
    #[error("parse error: {reason}")]
    Parse {
        /// Description of the problem, as reported by the parser.
        reason: String,
    },

    /// An attribute path is malformed.
    #[error("invalid attribute path `{path}`: {reason}")]
    InvalidPath {
        /// The path as written.
        path: String,
        /// Description of the problem.
        reason: String,
    },
}

impl LanguageError {
    pub(crate) fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }
}

/// Faults raised while evaluating a compiled expression.
///
/// The decision engine maps every variant to `Indeterminate`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    /// A referenced attribute is absent from the context.
    #[error("attribute `{path}` is not present in the context")]
    MissingAttribute {
        /// Fully qualified attribute path.
        path: String,
    },

    /// The interpreter rejected the expression at run time, for instance an
    /// operator applied to operands it has no overload for.
    #[error("evaluation failed: {reason}")]
    Execution {
        /// Interpreter message.
        reason: String,
    },

    /// The result could not be coerced to a boolean.
    #[error("expected a boolean, got {value}")]
    NonBoolean {
        /// The offending value.
        value: Value,
    },
}
