//! Error types for the visualization core.

use riskscape_env::EnvError;
use thiserror::Error;

/// Errors raised by the engine.
///
/// Only data-shape and configuration problems are errors. Missing
/// references are skipped and numeric outliers are clamped.
#[derive(Debug, Error)]
pub enum VizError {
    /// Snapshot rejected before any state was touched
    #[error("Malformed snapshot: {reason}")]
    MalformedSnapshot { reason: String },

    /// Invalid engine configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Failure crossing the data-access boundary
    #[error(transparent)]
    Env(#[from] EnvError),
}

impl VizError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedSnapshot {
            reason: reason.into(),
        }
    }
}
