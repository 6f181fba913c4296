//! Attribute resolution for the policy decision point.
//!
//! The decision engine only knows which attributes a target, condition or
//! rule handler needs. [`AttributeResolver`] asks an integrator-supplied
//! [`AttributeFetch`] for them, merges the answers into the request context,
//! and reports the paths that are still missing.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod fetch;
mod resolver;

pub use error::{AttributeError, AttributeResult};
pub use fetch::{AttributeFetch, StaticAttributes};
pub use resolver::AttributeResolver;
