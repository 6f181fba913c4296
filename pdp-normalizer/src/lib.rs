//! Normalization of externally authored policy documents.
//!
//! Every entry point takes a loosely-typed document plus a caller-owned error
//! list, and always returns a best-effort canonical record. Each field is
//! coerced and validated on its own: a failing field is left empty and
//! reported, and its siblings are still processed. The caller decides what a
//! non-empty error list means.

#![warn(missing_docs, clippy::pedantic)]

mod fields;
mod normalizer;
mod shape;

pub use normalizer::{HTTP_METHODS, Normalizer};
pub use shape::TargetShape;
