//! Message Ledger - append-only, time-ordered record of every hop.

use rsvp_env::{MessageId, MessageIdGen};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Endpoint, Message, MessageStatus, Payload};

/// One recorded status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub message: MessageId,
    pub from: MessageStatus,
    pub to: MessageStatus,
    pub at_ms: u64,
}

/// Ordered message history plus the journal of status transitions.
///
/// Messages are never removed individually; `clear` drops the whole run.
#[derive(Debug, Clone, Default)]
pub struct MessageLedger {
    messages: Vec<Message>,
    transitions: Vec<StatusTransition>,
    ids: MessageIdGen,
}

impl MessageLedger {
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Appends a message in `Sending` status and returns a copy of it.
    pub fn append(&mut self, from: Endpoint, to: Endpoint, payload: Payload, created_at_ms: u64) -> Message {
        let message = Message {
            id: self.ids.next_id(),
            kind: payload.kind(),
            from,
            to,
            payload,
            created_at_ms,
            status: MessageStatus::Sending,
        };
        self.messages.push(message.clone());
        message
    }
    
    /// Moves a message one step forward to `status`.
    ///
    /// Returns `false` without touching anything when the id is unknown or
    /// `status` is not the immediate successor of the current one.
    pub fn set_status(&mut self, id: MessageId, status: MessageStatus, at_ms: u64) -> bool {
        // Ids are assigned in append order, so the list is sorted by id
        let Ok(index) = self.messages.binary_search_by_key(&id, |m| m.id) else {
            debug!(%id, "status update for unknown message ignored");
            return false;
        };
        
        let message = &mut self.messages[index];
        if message.status.next() != Some(status) {
            debug!(%id, current = ?message.status, requested = ?status, "out-of-order status update ignored");
            return false;
        }
        
        self.transitions.push(StatusTransition {
            message: id,
            from: message.status,
            to: status,
            at_ms,
        });
        message.status = status;
        true
    }
    
    /// Full history, oldest first.
    pub fn all(&self) -> &[Message] {
        &self.messages
    }
    
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages
            .binary_search_by_key(&id, |m| m.id)
            .ok()
            .map(|i| &self.messages[i])
    }
    
    /// Status transitions in the order they happened.
    pub fn transitions(&self) -> &[StatusTransition] {
        &self.transitions
    }
    
    pub fn len(&self) -> usize {
        self.messages.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
    
    /// Drops every message and transition. Ids keep counting up.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.transitions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Invitation;
    
    fn payload() -> Payload {
        Payload::Invitation(Invitation::new("Team Sync", "2025-02-15", "14:00", "Room A", "Sarah", 0))
    }
    
    #[test]
    fn test_append_assigns_sending_and_unique_ids() {
        let mut ledger = MessageLedger::new();
        let a = ledger.append(Endpoint::Host, Endpoint::Coordinator, payload(), 10);
        let b = ledger.append(Endpoint::Coordinator, Endpoint::Guest("Alice Chen".into()), payload(), 20);
        
        assert_ne!(a.id, b.id);
        assert_eq!(a.status, MessageStatus::Sending);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.all()[1].to.to_string(), "Alice Chen");
    }
    
    #[test]
    fn test_status_moves_forward_only() {
        let mut ledger = MessageLedger::new();
        let msg = ledger.append(Endpoint::Host, Endpoint::Coordinator, payload(), 0);
        
        assert!(ledger.set_status(msg.id, MessageStatus::Delivered, 800));
        assert!(!ledger.set_status(msg.id, MessageStatus::Delivered, 900));
        assert!(!ledger.set_status(msg.id, MessageStatus::Sending, 900));
        assert!(ledger.set_status(msg.id, MessageStatus::Processed, 1800));
        
        assert_eq!(ledger.get(msg.id).unwrap().status, MessageStatus::Processed);
        let steps: Vec<_> = ledger.transitions().iter().map(|t| (t.from, t.to)).collect();
        assert_eq!(
            steps,
            vec![
                (MessageStatus::Sending, MessageStatus::Delivered),
                (MessageStatus::Delivered, MessageStatus::Processed),
            ]
        );
    }
    
    #[test]
    fn test_skipping_delivered_is_refused() {
        let mut ledger = MessageLedger::new();
        let msg = ledger.append(Endpoint::Host, Endpoint::Coordinator, payload(), 0);
        
        assert!(!ledger.set_status(msg.id, MessageStatus::Processed, 800));
        assert_eq!(ledger.get(msg.id).unwrap().status, MessageStatus::Sending);
        assert!(ledger.transitions().is_empty());
        
        assert!(ledger.set_status(msg.id, MessageStatus::Delivered, 800));
        assert!(ledger.set_status(msg.id, MessageStatus::Processed, 1100));
    }
    
    #[test]
    fn test_unknown_id_is_noop() {
        let mut ledger = MessageLedger::new();
        ledger.append(Endpoint::Host, Endpoint::Coordinator, payload(), 0);
        
        assert!(!ledger.set_status(MessageId(999), MessageStatus::Processed, 0));
        assert!(ledger.transitions().is_empty());
        assert_eq!(ledger.all()[0].status, MessageStatus::Sending);
    }
    
    #[test]
    fn test_clear_keeps_ids_fresh() {
        let mut ledger = MessageLedger::new();
        let first = ledger.append(Endpoint::Host, Endpoint::Coordinator, payload(), 0);
        ledger.clear();
        assert!(ledger.is_empty());
        
        let second = ledger.append(Endpoint::Host, Endpoint::Coordinator, payload(), 0);
        assert!(second.id > first.id);
        assert!(!ledger.set_status(first.id, MessageStatus::Delivered, 0));
    }
}
