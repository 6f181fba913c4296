//! XACML-style policy decision point facade.
//!
//! Depend on this crate to pull in the decision point as a whole. Each
//! component sits behind a feature flag (all enabled by default) so hosts
//! can keep only the pieces they embed.

#![warn(missing_docs, clippy::pedantic)]

/// Shared vocabulary: ids, decisions, records and the request context.
pub use pdp_primitives as primitives;

/// Expression language (enabled by `language` feature).
#[cfg(feature = "language")]
pub use pdp_language as language;

/// Document normalization (enabled by `normalizer` feature).
#[cfg(feature = "normalizer")]
pub use pdp_normalizer as normalizer;

/// Attribute resolution (enabled by `attributes` feature).
#[cfg(feature = "attributes")]
pub use pdp_attributes as attributes;

/// Decision engine (enabled by `engine` feature).
#[cfg(feature = "engine")]
pub use pdp_engine as engine;

/// Typed settings and loader (enabled by `config` feature).
#[cfg(feature = "config")]
pub use pdp_config as config;

/// Logging bootstrap (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use pdp_telemetry as telemetry;
