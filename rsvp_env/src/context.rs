//! Core environment context trait for the choreography engine.

use async_trait::async_trait;
use rand::RngCore;
use std::future::Future;
use std::time::{Duration, SystemTime};

/// The central interface for Environment Interaction.
///
/// This trait abstracts the "real world" so that the choreography engine can
/// run against a live clock (tokio) or a virtual clock (simulation).
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, OS entropy
/// - **Simulation**: `SimContext` - virtual clock, `ChaCha8Rng(seed)`
///
/// # Determinism
///
/// Every source of non-determinism the engine touches (time, randomness)
/// is reached through this trait, so a seeded implementation replays a run
/// exactly.
#[async_trait]
pub trait ChoreoContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// All step fire times are expressed on this clock.
    fn now(&self) -> Duration;
    
    /// Returns the wall-clock time used for entity timestamps.
    fn system_time(&self) -> SystemTime;
    
    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances the virtual clock
    async fn sleep(&self, duration: Duration);
    
    /// Spawns a background task.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
    
    /// Derives a random source for one consumer of randomness.
    ///
    /// Seeded implementations combine the master seed with `stream` so that
    /// independent consumers get independent but reproducible sequences.
    fn derive_rng(&self, stream: u64) -> Box<dyn RngCore + Send>;
    
    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    fn seed(&self) -> u64;
    
    /// Returns the wall-clock instant that corresponds to `now() == 0`.
    fn epoch(&self) -> SystemTime {
        self.system_time()
            .checked_sub(self.now())
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }
}
