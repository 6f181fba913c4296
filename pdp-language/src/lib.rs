//! Expression language for policy targets and conditions.
//!
//! The [`Language`] trait is the seam the normalizer and the decision engine
//! talk to. [`ExpressionLanguage`] is the default implementation, backed by
//! CEL: every context category (`subject`, `resource`, `action`,
//! `environment`) is a variable, and attribute paths are member accesses on
//! it. Expressions are compiled once and executed against a
//! [`pdp_primitives::Context`].

#![warn(missing_docs, clippy::pedantic)]

mod convert;
mod error;
mod expression;
mod language;
mod value;

pub use convert::{cel_to_json, json_to_cel};
pub use error::{EvaluationError, LanguageError, LanguageResult};
pub use expression::{AttributePath, Expression};
pub use language::{ContextQuery, ExpressionLanguage, Language};
pub use value::coerce_to_bool;
