//! Production implementation of ChoreoContext using Tokio.

use crate::ChoreoContext;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;
use tracing::Instrument;

/// Production context backed by Tokio and OS entropy.
///
/// Time comes from the tokio clock, so a runtime started with paused time
/// (`#[tokio::test(start_paused = true)]`) drives the engine without real
/// waiting. Randomness comes from the OS.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,
    
    /// Wall-clock instant captured together with `start`
    start_wall: SystemTime,
}

impl TokioContext {
    /// Creates a new TokioContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            start_wall: SystemTime::now(),
        }
    }
    
    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChoreoContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
    
    fn system_time(&self) -> SystemTime {
        self.start_wall + self.now()
    }
    
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
    
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let span = tracing::debug_span!("task", name = %name);
        tokio::spawn(future.instrument(span));
    }
    
    fn derive_rng(&self, _stream: u64) -> Box<dyn RngCore + Send> {
        // Production is not seeded
        Box::new(StdRng::from_entropy())
    }
    
    fn seed(&self) -> u64 {
        0
    }
    
    fn epoch(&self) -> SystemTime {
        self.start_wall
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[tokio::test]
    async fn test_tokio_context_time() {
        let ctx = TokioContext::new();
        let t1 = ctx.now();
        ctx.sleep(Duration::from_millis(10)).await;
        let t2 = ctx.now();
        
        assert!(t2 > t1);
        assert!(t2 - t1 >= Duration::from_millis(10));
    }
    
    #[tokio::test(start_paused = true)]
    async fn test_tokio_context_follows_paused_clock() {
        let ctx = TokioContext::new();
        ctx.sleep(Duration::from_secs(30)).await;
        
        assert!(ctx.now() >= Duration::from_secs(30));
        assert_eq!(ctx.epoch(), ctx.start_wall);
    }
    
    #[tokio::test]
    async fn test_tokio_context_rng_unseeded() {
        let ctx = TokioContext::new();
        let mut a = ctx.derive_rng(1);
        let mut b = ctx.derive_rng(1);
        
        // Unseeded streams should diverge
        let xs: Vec<u64> = (0..4).map(|_| a.next_u64()).collect();
        let ys: Vec<u64> = (0..4).map(|_| b.next_u64()).collect();
        assert_ne!(xs, ys);
    }
    
    #[test]
    fn test_tokio_context_seed() {
        let ctx = TokioContext::new();
        assert_eq!(ctx.seed(), 0);
    }
}
