//! Error types for the environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Clock reading could not be mapped onto wall-clock time
    #[error("Clock error: {0}")]
    ClockError(String),
}

impl EnvError {
    /// Creates a clock error.
    pub fn clock(msg: impl Into<String>) -> Self {
        Self::ClockError(msg.into())
    }
}
