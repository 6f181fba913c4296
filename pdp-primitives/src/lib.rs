//! Core shared types for the policy decision point.
//!
//! Everything the normalizer produces and the decision engine consumes lives
//! here, so collaborators can be written against this crate alone.

#![warn(missing_docs, clippy::pedantic)]

mod algorithm;
mod attribute_map;
mod context;
mod decision;
mod error;
mod ids;
pub mod json;
mod records;
mod target;
mod validation;

/// Built-in and custom combining algorithm identifiers.
pub use algorithm::{BuiltinAlgorithm, CombiningAlgorithm};
/// Category-indexed attribute dependencies.
pub use attribute_map::AttributeMap;
/// Decision request state and the outward response.
pub use context::{
    ACTION, Context, DecisionResponse, ENVIRONMENT, PolicyListEntry, RESOURCE, SUBJECT, TracedElement,
};
/// Four-valued decisions and two-valued effects.
pub use decision::{Decision, Effect};
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Element identifiers and versions.
pub use ids::{ElementId, Version};
/// Canonical policy records.
pub use records::{
    Advice, Directive, HandlerRecord, HandlerRef, Obligation, Policy, PolicySet,
    RawHandlerDocument, Rule,
};
/// Canonical Target/Condition shape.
pub use target::{AllOf, AnyOf, Target};
/// Field-level validation problems collected by the normalizer.
pub use validation::{ElementKind, ValidationError};
