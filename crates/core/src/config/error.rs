//! Error types for configuration loading.
//!
//! This module defines all errors that can occur while reading and validating
//! `.hivekit/config.toml`.

use crate::errors::{ErrorDomain, FrameworkError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk.
    #[error("Failed to read config file at {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML file at {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Values parsed but are out of range.
    #[error("Invalid configuration in {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },
}

impl From<ConfigError> for FrameworkError {
    fn from(error: ConfigError) -> Self {
        let path = match &error {
            ConfigError::FileRead { path, .. }
            | ConfigError::TomlParse { path, .. }
            | ConfigError::InvalidConfig { path, .. } => path.display().to_string(),
        };
        FrameworkError::validation(ErrorDomain::Framework, error.to_string())
            .with_context("path", serde_json::Value::String(path))
    }
}

/// Type alias for Result with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
