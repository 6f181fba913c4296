//! Configuration management for the policy decision point.
//!
//! Settings are plain serde structs with a default for every field, so a
//! configuration file only needs to name what it changes.

#![warn(missing_docs, clippy::pedantic)]

pub mod loader;
pub mod schema;

pub use loader::{ConfigError, ConfigResult};
pub use schema::{
    EngineSettings, NormalizerSettings, PdpSettings, ResolutionStrategy, ResolverSettings,
    TelemetrySettings,
};
