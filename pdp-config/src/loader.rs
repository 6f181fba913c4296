//! Configuration loaders.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::schema::PdpSettings;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML document is malformed.
    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// The JSON document is malformed.
    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// The file extension is neither `.toml` nor `.json`.
    #[error("unsupported config file format: {extension}")]
    UnsupportedFormat {
        /// The extension found, empty when there was none.
        extension: String,
    },

    /// The settings parsed but are not usable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Description of the problem.
        reason: String,
    },
}

impl PdpSettings {
    /// Parses and validates settings from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] for malformed input and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let settings: Self = toml::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses and validates settings from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed input and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_json_str(source: &str) -> ConfigResult<Self> {
        let settings: Self = serde_json::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from a `.toml` or `.json` file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedFormat`] for any other extension,
    /// [`ConfigError::Io`] when the file cannot be read, and the parse or
    /// validation errors of the matching `from_*_str` loader.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if extension != "toml" && extension != "json" {
            return Err(ConfigError::UnsupportedFormat { extension });
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loading configuration");
        if extension == "toml" {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Checks invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the telemetry filter is empty or
    /// the root combining algorithm names an empty custom id.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.telemetry.filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                reason: "telemetry.filter must not be empty".into(),
            });
        }
        if self.engine.combining_algorithm.as_str().trim().is_empty() {
            return Err(ConfigError::Invalid {
                reason: "engine.combining_algorithm must not be empty".into(),
            });
        }
        Ok(())
    }
}
