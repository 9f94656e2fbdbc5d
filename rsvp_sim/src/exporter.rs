//! JSON timeline exporter.
//!
//! Records one frame per observed state change so a visual layer can replay
//! the message flow, and derives human-readable change events from two
//! consecutive snapshots (also used by the live CLI mode).

use crate::error::SimError;
use rsvp_core::{Decision, Message, MessageKind, MessageStatus, RunSnapshot, Summary, SystemStatus};
use rsvp_env::MessageId;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in milliseconds
    pub time_ms: u64,

    /// Actor statuses at this instant
    pub status: SystemStatus,

    /// Every message in the ledger
    pub messages: Vec<MessageFrame>,

    /// Responses recorded so far
    pub responses: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryFrame>,

    /// What changed since the previous frame
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimEvent>,
}

/// Ledger entry without its payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageFrame {
    pub id: MessageId,
    pub kind: MessageKind,
    pub from: String,
    pub to: String,
    pub status: MessageStatus,
}

impl From<&Message> for MessageFrame {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            kind: message.kind,
            from: message.from.to_string(),
            to: message.to.to_string(),
            status: message.status,
        }
    }
}

/// Summary counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryFrame {
    pub yes: usize,
    pub no: usize,
    pub maybe: usize,
    pub response_rate: f64,
    pub attendance_rate: f64,
}

impl From<&Summary> for SummaryFrame {
    fn from(summary: &Summary) -> Self {
        Self {
            yes: summary.count(Decision::Yes),
            no: summary.count(Decision::No),
            maybe: summary.count(Decision::Maybe),
            response_rate: summary.response_rate(),
            attendance_rate: summary.attendance_rate(),
        }
    }
}

/// Simulation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl SimEvent {
    fn info(message: String) -> Self {
        Self { message, level: None }
    }

    fn warn(message: String) -> Self {
        Self { message, level: Some("warn".to_string()) }
    }

    /// True for events that signal lost state.
    pub fn is_warning(&self) -> bool {
        self.level.as_deref() == Some("warn")
    }
}

/// Lists what changed between two snapshots, in ledger order.
pub fn changes(prev: &RunSnapshot, next: &RunSnapshot) -> Vec<SimEvent> {
    let mut events = Vec::new();

    if !prev.messages.is_empty() && next.messages.is_empty() {
        events.push(SimEvent::warn(format!(
            "ledger cleared ({} messages dropped)",
            prev.messages.len()
        )));
    }

    let actors = [
        ("Event Host", prev.status.host, next.status.host),
        ("Coordinator", prev.status.coordinator, next.status.coordinator),
        ("Guests", prev.status.guests, next.status.guests),
    ];
    for (actor, before, after) in actors {
        if before != after {
            events.push(SimEvent::info(format!("{}: {} -> {}", actor, before, after)));
        }
    }

    for message in &next.messages {
        let before = prev
            .messages
            .iter()
            .find(|m| m.id == message.id)
            .map(|m| m.status);

        if before != Some(message.status) {
            events.push(SimEvent::info(format!(
                "{} {} -> {} [{}] {}",
                message.id, message.from, message.to, message.kind, message.status
            )));
        }
    }

    if prev.summary.is_none() {
        if let Some(summary) = &next.summary {
            events.push(SimEvent::info(format!(
                "summary: {} yes / {} no / {} maybe ({} of {} responded)",
                summary.yes_count,
                summary.no_count,
                summary.maybe_count,
                summary.total_responses,
                summary.total_invited
            )));
        }
    }

    events
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Time of the last frame in milliseconds
    pub duration_ms: u64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_ms: 0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Appends a frame for `next` if anything changed since `prev`.
    pub fn record(&mut self, time_ms: u64, prev: &RunSnapshot, next: &RunSnapshot) {
        let events = changes(prev, next);
        if events.is_empty() {
            return;
        }

        self.add_frame(SimFrame {
            time_ms,
            status: next.status,
            messages: next.messages.iter().map(MessageFrame::from).collect(),
            responses: next.responses.len(),
            summary: next.summary.as_ref().map(SummaryFrame::from),
            events,
        });
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_ms = frame.time_ms;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsvp_core::{ActorStatus, Endpoint, Invitation, Payload};

    fn invitation_message(status: MessageStatus) -> Message {
        let invitation = Invitation::new("Team Sync", "2024-06-01", "10:00", "Room 4", "Sarah", 0);
        Message {
            id: MessageId(1),
            kind: MessageKind::Invitation,
            from: Endpoint::Host,
            to: Endpoint::Coordinator,
            payload: Payload::Invitation(invitation),
            created_at_ms: 0,
            status,
        }
    }

    #[test]
    fn test_changes_detects_new_and_advanced_messages() {
        let empty = RunSnapshot::default();
        let mut sending = RunSnapshot::default();
        sending.status.host = ActorStatus::Active;
        sending.messages.push(invitation_message(MessageStatus::Sending));

        let events = changes(&empty, &sending);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "Event Host: idle -> active");
        assert_eq!(events[1].message, "msg#1 Event Host -> Coordinator [invitation] sending");

        let mut delivered = sending.clone();
        delivered.messages[0].status = MessageStatus::Delivered;
        let events = changes(&sending, &delivered);
        assert_eq!(events.len(), 1);
        assert!(events[0].message.ends_with("delivered"));
    }

    #[test]
    fn test_changes_flags_cleared_ledger() {
        let mut active = RunSnapshot::default();
        active.status.host = ActorStatus::Active;
        active.messages.push(invitation_message(MessageStatus::Sending));

        let events = changes(&active, &RunSnapshot::default());
        assert!(events[0].is_warning());
        assert!(events[0].message.starts_with("ledger cleared"));
    }

    #[test]
    fn test_record_skips_unchanged_snapshots() {
        let snapshot = RunSnapshot::default();
        let mut export = SimExport::new("full_run", 7);

        export.record(100, &snapshot, &snapshot);
        assert!(export.frames.is_empty());

        let mut next = snapshot.clone();
        next.messages.push(invitation_message(MessageStatus::Sending));
        export.record(200, &snapshot, &next);

        assert_eq!(export.frames.len(), 1);
        assert_eq!(export.duration_ms, 200);
        assert_eq!(export.frames[0].messages[0].to, "Coordinator");
    }
}
