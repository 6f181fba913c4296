//! Logging bootstrap for policy decision point hosts.
//!
//! Every crate in the workspace logs through `tracing`. Hosts call
//! [`init_tracing`] once at startup to install a formatted subscriber whose
//! filter comes from [`TelemetrySettings`], with `RUST_LOG` taking
//! precedence when set.

#![warn(missing_docs, clippy::pedantic)]

use pdp_config::TelemetrySettings;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured filter directive does not parse.
    #[error("invalid log filter `{directive}`: {reason}")]
    InvalidFilter {
        /// Offending directive.
        directive: String,
        /// Parser message.
        reason: String,
    },
    /// A global subscriber is already installed.
    #[error("failed to install tracing subscriber: {reason}")]
    Install {
        /// Underlying message.
        reason: String,
    },
}

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Builds the filter: `RUST_LOG` when set, otherwise the configured
/// directive.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the configured directive
/// does not parse.
pub fn build_filter(settings: &TelemetrySettings) -> TelemetryResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&settings.filter).map_err(|error| TelemetryError::InvalidFilter {
        directive: settings.filter.clone(),
        reason: error.to_string(),
    })
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a bad directive and
/// [`TelemetryError::Install`] when a subscriber is already installed.
pub fn try_init_tracing(settings: &TelemetrySettings) -> TelemetryResult<()> {
    let filter = build_filter(settings)?;
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| TelemetryError::Install {
            reason: error.to_string(),
        })
}

/// Installs the global subscriber, logging and ignoring a failure so hosts
/// can call it unconditionally.
pub fn init_tracing(settings: &TelemetrySettings) {
    if let Err(error) = try_init_tracing(settings) {
        tracing::warn!(%error, "tracing subscriber not installed");
    }
}
