//! Error types for the Riskscape environment boundary.

use thiserror::Error;

/// Errors surfaced by data clients and asset loaders.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The requested bucket, entity or document does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend or resource could not be reached
    #[error("Unreachable: {0}")]
    Unreachable(String),

    /// Payload serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Local I/O failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Operation timed out
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// The request was abandoned before it completed
    #[error("Request cancelled")]
    Cancelled,
}

impl EnvError {
    /// Creates a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Creates an unreachable error.
    pub fn unreachable(what: impl std::fmt::Display) -> Self {
        Self::Unreachable(what.to_string())
    }
}

impl From<std::io::Error> for EnvError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EnvError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
