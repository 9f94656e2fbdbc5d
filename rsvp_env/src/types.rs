//! Common types for the environment abstraction.

use crate::error::EnvError;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::{Builder, Uuid};

/// Identifier of one message in the ledger.
///
/// Strictly increasing in append order, never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Returns the raw value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "msg#{}", self.0)
    }
}

/// Generation counter identifying one choreography run.
///
/// Every reset or new submission moves to a fresh generation; steps tagged
/// with an older generation are stale and must not touch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub u64);

impl RunId {
    /// The generation in effect before anything was submitted.
    pub const INITIAL: RunId = RunId(0);
    
    /// Returns the following generation.
    pub fn next(self) -> RunId {
        RunId(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run#{}", self.0)
    }
}

/// Monotonic generator for `MessageId`s.
#[derive(Debug, Clone, Default)]
pub struct MessageIdGen {
    next: u64,
}

impl MessageIdGen {
    /// Creates a generator starting at 0.
    pub fn new() -> Self {
        Self { next: 0 }
    }
    
    /// Mints the next id.
    pub fn next_id(&mut self) -> MessageId {
        let id = MessageId(self.next);
        self.next += 1;
        id
    }
}

/// Draws a version-4 UUID from the given random source.
///
/// Unlike `Uuid::new_v4()`, the result is reproducible when the source is
/// seeded.
pub fn uuid_from_rng<R: RngCore + ?Sized>(rng: &mut R) -> Uuid {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    Builder::from_random_bytes(bytes).into_uuid()
}

/// Converts a wall-clock instant to milliseconds since the Unix epoch.
pub fn unix_millis(time: SystemTime) -> Result<u64, EnvError> {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .map_err(|e| EnvError::clock(format!("time before Unix epoch: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use std::time::Duration;
    
    #[test]
    fn test_message_id_gen_monotonic() {
        let mut gen = MessageIdGen::new();
        let a = gen.next_id();
        let b = gen.next_id();
        assert!(a < b);
        assert_eq!(b.raw(), 1);
    }
    
    #[test]
    fn test_run_id_next() {
        assert_eq!(RunId::INITIAL.next(), RunId(1));
        assert_eq!(format!("{}", RunId(3)), "run#3");
    }
    
    #[test]
    fn test_uuid_from_rng_is_v4_and_reproducible() {
        let a = uuid_from_rng(&mut StepRng::new(7, 3));
        let b = uuid_from_rng(&mut StepRng::new(7, 3));
        assert_eq!(a, b);
        assert_eq!(a.get_version_num(), 4);
    }
    
    #[test]
    fn test_unix_millis() {
        let t = UNIX_EPOCH + Duration::from_millis(1_500);
        assert_eq!(unix_millis(t).unwrap(), 1_500);
        
        let before = UNIX_EPOCH - Duration::from_secs(1);
        assert!(unix_millis(before).is_err());
    }
}
