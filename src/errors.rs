//! licenselog error types.

use thiserror::Error;

/// Errors that can occur while logging, querying or aggregating records.
#[derive(Debug, Error)]
pub enum LicenseLogError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Request payload or query parameters are malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// API key missing or does not match the configured secret.
    #[error("Missing or invalid API key")]
    Unauthorized,

    /// No matching resource.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Store I/O or persistence failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Request exceeded its deadline.
    #[error("Request timed out after {after_ms}ms")]
    Timeout {
        /// The deadline that was exceeded, in milliseconds.
        after_ms: u64,
    },

    /// HTTP listener failed to bind or serve.
    #[error("Server error: {0}")]
    Server(String),
}

impl LicenseLogError {
    /// Stable machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "config_error",
            Self::Validation(_) => "validation_error",
            Self::Unauthorized => "auth_error",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage_error",
            Self::Timeout { .. } => "timeout",
            Self::Server(_) => "server_error",
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<rusqlite::Error> for LicenseLogError {
    fn from(e: rusqlite::Error) -> Self {
        LicenseLogError::Storage(e.to_string())
    }
}

impl From<r2d2::Error> for LicenseLogError {
    fn from(e: r2d2::Error) -> Self {
        LicenseLogError::Storage(format!("reader pool: {}", e))
    }
}
