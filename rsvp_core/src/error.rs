//! Error types for the choreography engine.

use rsvp_env::EnvError;
use thiserror::Error;

use crate::status::ActorStatus;

/// Errors surfaced at the engine boundary.
///
/// Scheduled steps never fail; everything here is raised synchronously by
/// an entry point or while loading configuration.
#[derive(Debug, Error)]
pub enum ChoreoError {
    /// A run is still active (host is not idle)
    #[error("A choreography run is already in progress (host is {0})")]
    RunInProgress(ActorStatus),
    
    /// Invitation is missing a required field
    #[error("Invalid invitation: {0}")]
    InvalidInvitation(String),
    
    /// Guest roster has no entries
    #[error("Guest roster is empty")]
    EmptyRoster,
    
    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    
    /// Configuration file could not be read
    #[error("Failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),
    
    /// Configuration file is not valid JSON for the expected shape
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
    
    /// Environment layer failure
    #[error(transparent)]
    Env(#[from] EnvError),
}

impl ChoreoError {
    /// Creates an invalid-invitation error.
    pub fn invalid_invitation(msg: impl Into<String>) -> Self {
        Self::InvalidInvitation(msg.into())
    }
    
    /// Creates an invalid-config error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
