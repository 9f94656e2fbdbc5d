//! Guest Registry - the fixed roster of invitees.

use std::time::Duration;

use crate::error::ChoreoError;
use crate::model::{Guest, Tendency};

/// Read-only, ordered guest roster.
///
/// The order is stable and drives both fan-out staggering and completion
/// counting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestRegistry {
    guests: Vec<Guest>,
}

impl GuestRegistry {
    /// Builds a registry from an explicit roster.
    pub fn new(guests: Vec<Guest>) -> Result<Self, ChoreoError> {
        if guests.is_empty() {
            return Err(ChoreoError::EmptyRoster);
        }
        Ok(Self { guests })
    }
    
    /// The five-guest reference roster.
    pub fn reference() -> Self {
        Self {
            guests: vec![
                Guest::new("guest-1", "Alice Chen", "alice.chen@company.com", Tendency::Yes, 2000),
                Guest::new("guest-2", "Bob Rodriguez", "bob.rodriguez@company.com", Tendency::Maybe, 3000),
                Guest::new("guest-3", "Carol Williams", "carol.williams@company.com", Tendency::Yes, 1500),
                Guest::new("guest-4", "David Kim", "david.kim@company.com", Tendency::No, 4000),
                Guest::new("guest-5", "Emma Thompson", "emma.thompson@company.com", Tendency::Random, 2500),
            ],
        }
    }
    
    /// All guests in roster order.
    pub fn list(&self) -> &[Guest] {
        &self.guests
    }
    
    pub fn len(&self) -> usize {
        self.guests.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.guests.is_empty()
    }
    
    pub fn get(&self, index: usize) -> Option<&Guest> {
        self.guests.get(index)
    }
    
    /// Reaction delay of the slowest guest.
    pub fn max_reaction_delay(&self) -> Duration {
        self.guests
            .iter()
            .map(Guest::reaction_delay)
            .max()
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for GuestRegistry {
    fn default() -> Self {
        Self::reference()
    }
}
