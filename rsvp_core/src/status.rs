//! Per-actor activity state.
//!
//! A plain state bag: the choreography sets these at fixed points and
//! nothing here validates transitions.

use serde::{Deserialize, Serialize};

/// Activity of one actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorStatus {
    #[default]
    Idle,
    Active,
    Processing,
}

impl std::fmt::Display for ActorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActorStatus::Idle => f.write_str("idle"),
            ActorStatus::Active => f.write_str("active"),
            ActorStatus::Processing => f.write_str("processing"),
        }
    }
}

/// Snapshot of all three actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SystemStatus {
    pub host: ActorStatus,
    pub coordinator: ActorStatus,
    pub guests: ActorStatus,
}

impl SystemStatus {
    /// All actors idle.
    pub fn idle() -> Self {
        Self::default()
    }
    
    /// True when every actor is idle.
    pub fn is_idle(&self) -> bool {
        *self == Self::idle()
    }
}

/// Owner of the status snapshot.
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    current: SystemStatus,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }
    
    pub fn snapshot(&self) -> SystemStatus {
        self.current
    }
    
    pub fn set_host(&mut self, status: ActorStatus) {
        self.current.host = status;
    }
    
    pub fn set_coordinator(&mut self, status: ActorStatus) {
        self.current.coordinator = status;
    }
    
    pub fn set_guests(&mut self, status: ActorStatus) {
        self.current.guests = status;
    }
    
    /// Returns every actor to idle.
    pub fn reset(&mut self) {
        self.current = SystemStatus::idle();
    }
}
