use std::path::Path;

use keygate_credentials::AttestationConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What to deliver when a request is malformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationFailurePolicy {
    /// Complete with an `{error: reason}` envelope.
    #[default]
    Report,
    /// Complete with no response items at all.
    Silent,
}

/// Authenticator settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticatorConfig {
    /// Subject and serial settings for attestation certificates.
    pub attestation: AttestationConfig,

    /// Applies to validation and decode failures only. Component failures
    /// and a missing message are always reported.
    pub validation_failures: ValidationFailurePolicy,
}

/// Errors loading an [`AuthenticatorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The contents are not a valid config.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl AuthenticatorConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid JSON or field types.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}
