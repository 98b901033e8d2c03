//! Harness errors.

use riskscape_core::VizError;
use riskscape_env::EnvError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// A scenario assertion did not hold
    #[error("check failed: {0}")]
    Check(String),

    #[error(transparent)]
    Viz(#[from] VizError),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Fails the scenario with `message` unless `condition` holds.
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), SimError> {
    if condition {
        Ok(())
    } else {
        Err(SimError::Check(message()))
    }
}
