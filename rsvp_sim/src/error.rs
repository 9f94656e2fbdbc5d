//! Error types for the simulation harness.

use rsvp_core::ChoreoError;
use thiserror::Error;

/// Errors raised while setting up, exporting or observing a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// The engine refused its configuration or an entry point
    #[error(transparent)]
    Choreo(#[from] ChoreoError),
    
    /// Timeline file could not be written
    #[error("export failed: {0}")]
    Export(#[from] std::io::Error),
    
    /// Timeline could not be serialized
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    
    /// The async runtime for live mode could not be built
    #[error("runtime setup failed: {0}")]
    Runtime(std::io::Error),
    
    /// The live snapshot feed closed before a summary arrived
    #[error("snapshot feed closed before the run completed")]
    FeedClosed,
}
