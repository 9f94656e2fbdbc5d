//! Data model for the RSVP exchange.
//!
//! Every entity here is immutable once built, except `Message::status`, which
//! only the ledger mutates.

use rsvp_env::MessageId;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::error::ChoreoError;

// =============================================================================
// INVITATION
// =============================================================================

/// The event description published by the Host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub event_name: String,
    pub event_date: String,
    pub event_time: String,
    pub location: String,
    pub description: String,
    pub host_name: String,
    /// Creation time, milliseconds since the Unix epoch
    pub created_at_ms: u64,
}

impl Invitation {
    /// Creates an invitation with a fresh id and an empty description.
    pub fn new(
        event_name: impl Into<String>,
        event_date: impl Into<String>,
        event_time: impl Into<String>,
        location: impl Into<String>,
        host_name: impl Into<String>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_name: event_name.into(),
            event_date: event_date.into(),
            event_time: event_time.into(),
            location: location.into(),
            description: String::new(),
            host_name: host_name.into(),
            created_at_ms,
        }
    }
    
    /// Sets the free-text description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
    
    /// Overrides the generated id (for reproducible runs).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
    
    /// Checks the fields the host must fill in before publishing.
    pub fn validate(&self) -> Result<(), ChoreoError> {
        if self.event_name.trim().is_empty() {
            return Err(ChoreoError::invalid_invitation("event name is empty"));
        }
        if self.host_name.trim().is_empty() {
            return Err(ChoreoError::invalid_invitation("host name is empty"));
        }
        Ok(())
    }
}

// =============================================================================
// GUEST
// =============================================================================

/// A guest's configured bias toward a particular decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tendency {
    Yes,
    No,
    Maybe,
    Random,
}

/// Per-guest behaviour knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestPreferences {
    pub tendency: Tendency,
    /// Latency before this guest answers, in milliseconds
    pub reaction_delay_ms: u64,
}

/// A roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub id: String,
    pub name: String,
    pub email: String,
    pub preferences: GuestPreferences,
}

impl Guest {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        tendency: Tendency,
        reaction_delay_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            preferences: GuestPreferences {
                tendency,
                reaction_delay_ms,
            },
        }
    }
    
    /// Reaction delay as a `Duration`.
    pub fn reaction_delay(&self) -> Duration {
        Duration::from_millis(self.preferences.reaction_delay_ms)
    }
}

// =============================================================================
// RESPONSE / SUMMARY
// =============================================================================

/// A guest's answer to an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Yes,
    No,
    Maybe,
}

impl Decision {
    pub const ALL: [Decision; 3] = [Decision::Yes, Decision::No, Decision::Maybe];
    
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Yes => "yes",
            Decision::No => "no",
            Decision::Maybe => "maybe",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single guest's decision plus optional remark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub id: Uuid,
    pub invitation_id: Uuid,
    pub guest_id: String,
    pub guest_name: String,
    pub decision: Decision,
    pub message: Option<String>,
    pub created_at_ms: u64,
}

/// Aggregate tally and full response list for one invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub id: Uuid,
    pub invitation_id: Uuid,
    pub total_invited: usize,
    pub total_responses: usize,
    pub yes_count: usize,
    pub no_count: usize,
    pub maybe_count: usize,
    pub responses: Vec<Response>,
    pub created_at_ms: u64,
}

impl Summary {
    /// Fraction of invited guests that answered, in `[0, 1]`.
    pub fn response_rate(&self) -> f64 {
        if self.total_invited == 0 {
            return 0.0;
        }
        self.total_responses as f64 / self.total_invited as f64
    }
    
    /// Fraction of answers that were `yes`, in `[0, 1]`.
    pub fn attendance_rate(&self) -> f64 {
        if self.total_responses == 0 {
            return 0.0;
        }
        self.yes_count as f64 / self.total_responses as f64
    }
    
    /// Number of responses carrying the given decision.
    pub fn count(&self, decision: Decision) -> usize {
        match decision {
            Decision::Yes => self.yes_count,
            Decision::No => self.no_count,
            Decision::Maybe => self.maybe_count,
        }
    }
}

// =============================================================================
// MESSAGE
// =============================================================================

/// Which kind of payload a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Invitation,
    Response,
    Summary,
}

/// Delivery status of a message. Ordered: transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Delivered,
    Processed,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MessageKind::Invitation => "invitation",
            MessageKind::Response => "response",
            MessageKind::Summary => "summary",
        })
    }
}

impl MessageStatus {
    /// The only status a message may move to from this one.
    pub fn next(self) -> Option<MessageStatus> {
        match self {
            MessageStatus::Sending => Some(MessageStatus::Delivered),
            MessageStatus::Delivered => Some(MessageStatus::Processed),
            MessageStatus::Processed => None,
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MessageStatus::Sending => "sending",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Processed => "processed",
        })
    }
}

/// Sender or recipient of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "name", rename_all = "lowercase")]
pub enum Endpoint {
    Host,
    Coordinator,
    Guest(String),
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Host => f.write_str("Event Host"),
            Endpoint::Coordinator => f.write_str("Coordinator"),
            Endpoint::Guest(name) => f.write_str(name),
        }
    }
}

/// Body of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "lowercase")]
pub enum Payload {
    Invitation(Invitation),
    Response(Response),
    Summary(Summary),
}

impl Payload {
    pub fn kind(&self) -> MessageKind {
        match self {
            Payload::Invitation(_) => MessageKind::Invitation,
            Payload::Response(_) => MessageKind::Response,
            Payload::Summary(_) => MessageKind::Summary,
        }
    }
}

/// One hop of the choreography.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub kind: MessageKind,
    pub from: Endpoint,
    pub to: Endpoint,
    pub payload: Payload,
    pub created_at_ms: u64,
    pub status: MessageStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    
    fn summary(yes: usize, no: usize, maybe: usize) -> Summary {
        let total = yes + no + maybe;
        Summary {
            id: Uuid::nil(),
            invitation_id: Uuid::nil(),
            total_invited: total,
            total_responses: total,
            yes_count: yes,
            no_count: no,
            maybe_count: maybe,
            responses: Vec::new(),
            created_at_ms: 0,
        }
    }
    
    #[test]
    fn test_invitation_validation() {
        let ok = Invitation::new("Team Sync", "2025-02-15", "14:00", "Room A", "Sarah", 0);
        assert!(ok.validate().is_ok());
        
        let no_name = Invitation::new("  ", "2025-02-15", "14:00", "Room A", "Sarah", 0);
        assert!(matches!(no_name.validate(), Err(ChoreoError::InvalidInvitation(_))));
        
        let no_host = Invitation::new("Team Sync", "2025-02-15", "14:00", "Room A", "", 0);
        assert!(no_host.validate().is_err());
    }
    
    #[test]
    fn test_summary_rates() {
        let s = summary(3, 1, 1);
        assert_eq!(s.response_rate(), 1.0);
        assert!((s.attendance_rate() - 0.6).abs() < 1e-9);
        assert_eq!(s.count(Decision::No), 1);
        
        let empty = summary(0, 0, 0);
        assert_eq!(empty.response_rate(), 0.0);
        assert_eq!(empty.attendance_rate(), 0.0);
    }
    
    #[test]
    fn test_status_ordering() {
        assert!(MessageStatus::Sending < MessageStatus::Delivered);
        assert!(MessageStatus::Delivered < MessageStatus::Processed);
    }
    
    #[test]
    fn test_endpoint_labels() {
        assert_eq!(Endpoint::Host.to_string(), "Event Host");
        assert_eq!(Endpoint::Coordinator.to_string(), "Coordinator");
        assert_eq!(Endpoint::Guest("Alice Chen".into()).to_string(), "Alice Chen");
    }
    
    #[test]
    fn test_tendency_serde_lowercase() {
        let json = serde_json::to_string(&Tendency::Random).unwrap();
        assert_eq!(json, "\"random\"");
        let back: Decision = serde_json::from_str("\"maybe\"").unwrap();
        assert_eq!(back, Decision::Maybe);
    }
}
