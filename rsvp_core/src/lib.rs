//! RSVP Core - choreography engine for a simulated publish/subscribe exchange
//!
//! Three parties trade typed messages with artificial latency:
//! 1. **Event Host** publishes an invitation
//! 2. **Coordinator** fans it out to every guest and collects answers
//! 3. **Guests** decide after their own reaction delay
//!
//! The coordinator finally returns a summary to the host. Every hop moves
//! through `sending → delivered → processed` on a fixed timetable, and the
//! whole run can be cancelled at any point.

pub mod model;
pub mod roster;
pub mod decision;
pub mod ledger;
pub mod status;
pub mod scheduler;
pub mod summary;
pub mod choreography;
pub mod config;
pub mod error;
pub mod service;

// Re-export key types for convenience
pub use choreography::{Choreography, RunSnapshot, Step};
pub use config::{ChoreographyConfig, ChoreographyTimings, SummaryPolicy};
pub use error::ChoreoError;
pub use ledger::{MessageLedger, StatusTransition};
pub use model::{
    Decision, Endpoint, Guest, GuestPreferences, Invitation, Message, MessageKind, MessageStatus,
    Payload, Response, Summary, Tendency,
};
pub use roster::GuestRegistry;
pub use service::ChoreographyService;
pub use status::{ActorStatus, SystemStatus};
