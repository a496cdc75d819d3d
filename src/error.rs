//! Error types for the fingerprint engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FingerprintError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FingerprintError {
    #[error("YAML parsing error: {0}")]
    YamlError(String),
    #[error("JSON parsing error: {0}")]
    JsonError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("HTTP signature set is empty or missing")]
    MissingHttpSignatures,
    #[error("Failed to compile signature '{name}': {reason}")]
    SignatureCompile { name: String, reason: String },
    #[error("Invalid port specification: {0}")]
    InvalidPort(String),
    #[error("Invalid alias '{name}': {reason}")]
    InvalidAlias { name: String, reason: String },
}

impl FingerprintError {
    pub(crate) fn compile(name: &str, reason: impl Into<String>) -> Self {
        FingerprintError::SignatureCompile {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn alias(name: &str, reason: impl Into<String>) -> Self {
        FingerprintError::InvalidAlias {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for FingerprintError {
    fn from(err: std::io::Error) -> Self {
        FingerprintError::IoError(err.to_string())
    }
}

impl From<serde_yaml::Error> for FingerprintError {
    fn from(err: serde_yaml::Error) -> Self {
        FingerprintError::YamlError(err.to_string())
    }
}

impl From<serde_json::Error> for FingerprintError {
    fn from(err: serde_json::Error) -> Self {
        FingerprintError::JsonError(err.to_string())
    }
}
