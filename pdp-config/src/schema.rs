//! Strongly typed configuration schemas.

use pdp_primitives::CombiningAlgorithm;
use serde::{Deserialize, Serialize};

/// Top-level settings, one section per component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdpSettings {
    /// Decision engine settings.
    pub engine: EngineSettings,
    /// Attribute resolver settings.
    pub resolver: ResolverSettings,
    /// Normalizer settings.
    pub normalizer: NormalizerSettings,
    /// Logging settings.
    pub telemetry: TelemetrySettings,
}

/// Decision engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Emit per-step evaluation traces at `debug` level.
    pub debug: bool,
    /// Algorithm of the synthetic root policy set built for every request.
    pub combining_algorithm: CombiningAlgorithm,
}

/// How the attribute resolver talks to the fetch collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStrategy {
    /// Resolve one path segment per level, recursing on the remainder.
    #[default]
    Recursive,
    /// Hand the whole attribute map to the fetcher in one call.
    Flat,
}

/// Attribute resolver settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Emit per-level resolution traces at `debug` level.
    pub debug: bool,
    /// Resolution strategy.
    pub strategy: ResolutionStrategy,
}

impl ResolverSettings {
    /// Returns settings using `strategy`.
    #[must_use]
    pub fn with_strategy(mut self, strategy: ResolutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Normalizer settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerSettings {
    /// Log every validation error at `debug` level as it is collected.
    pub debug: bool,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
        }
    }
}
