//! Choreography Service - runs the engine against a live context.
//!
//! This module is the integration layer between the clock-free
//! [`Choreography`] and the environment abstraction ([`ChoreoContext`]).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    ChoreographyService                       │
//! │                                                              │
//! │  submit / restart / reset ──► Mutex<Choreography> ◄── driver │
//! │                                     │              (sleep to │
//! │                                     │            next step)  │
//! │                                     ▼                        │
//! │                      watch::Sender<RunSnapshot> ──► consumers│
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use rsvp_core::{ChoreographyConfig, ChoreographyService, Invitation};
//! use rsvp_env::TokioContext;
//!
//! let service = ChoreographyService::new(TokioContext::shared(), ChoreographyConfig::default())?;
//! service.start();
//! service.submit_invitation(invitation)?;
//! let summary = service.wait_for_summary().await;
//! ```

use rsvp_env::{unix_millis, ChoreoContext, RunId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{watch, Notify};
use tracing::debug;

use crate::choreography::{Choreography, RunSnapshot};
use crate::config::ChoreographyConfig;
use crate::error::ChoreoError;
use crate::model::{Invitation, Summary};
use crate::roster::GuestRegistry;

/// RNG stream reserved for guest decisions and generated ids.
pub const DECISION_STREAM: u64 = 1;

/// Shared between the service handle and its driver task.
struct Shared {
    engine: Mutex<Choreography>,
    wake: Notify,
    snapshots: watch::Sender<RunSnapshot>,
    shutdown: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Choreography> {
        // Poisoned only if a step panicked; keep serving the last state
        self.engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
    
    fn publish(&self, engine: &Choreography) {
        self.snapshots.send_replace(engine.snapshot());
    }
}

/// Handle to a running choreography.
///
/// Generic over the context so the same service runs on tokio time or on a
/// simulated clock.
pub struct ChoreographyService<Ctx>
where
    Ctx: ChoreoContext,
{
    context: Arc<Ctx>,
    shared: Arc<Shared>,
}

impl<Ctx> ChoreographyService<Ctx>
where
    Ctx: ChoreoContext,
{
    /// Creates a service with an idle engine. Call [`start`](Self::start)
    /// to begin firing steps.
    pub fn new(context: Arc<Ctx>, config: ChoreographyConfig) -> Result<Self, ChoreoError> {
        let epoch_ms = unix_millis(context.epoch())?;
        let rng = context.derive_rng(DECISION_STREAM);
        let engine = Choreography::new(config, rng, epoch_ms)?;
        let (snapshots, _) = watch::channel(engine.snapshot());
        
        Ok(Self {
            context,
            shared: Arc::new(Shared {
                engine: Mutex::new(engine),
                wake: Notify::new(),
                snapshots,
                shutdown: AtomicBool::new(false),
            }),
        })
    }
    
    /// Spawns the driver task on the context.
    pub fn start(&self) {
        let context = Arc::clone(&self.context);
        let shared = Arc::clone(&self.shared);
        self.context.spawn("choreography-driver", drive(context, shared));
    }
    
    /// Stops the driver task. Pending steps stay queued but never fire.
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.wake.notify_one();
    }
    
    /// Starts a run now. Rejected while a run is active.
    pub fn submit_invitation(&self, invitation: Invitation) -> Result<RunId, ChoreoError> {
        let run = {
            let mut engine = self.shared.lock();
            let run = engine.submit_invitation(invitation, self.context.now())?;
            self.shared.publish(&engine);
            run
        };
        self.shared.wake.notify_one();
        Ok(run)
    }
    
    /// Cancels any active run, then starts a new one.
    pub fn restart(&self, invitation: Invitation) -> Result<RunId, ChoreoError> {
        let run = {
            let mut engine = self.shared.lock();
            let run = engine.restart(invitation, self.context.now())?;
            self.shared.publish(&engine);
            run
        };
        self.shared.wake.notify_one();
        Ok(run)
    }
    
    /// Cancels everything and clears all state.
    pub fn reset(&self) {
        {
            let mut engine = self.shared.lock();
            engine.reset();
            self.shared.publish(&engine);
        }
        self.shared.wake.notify_one();
    }
    
    pub fn snapshot(&self) -> RunSnapshot {
        self.shared.lock().snapshot()
    }
    
    pub fn roster(&self) -> GuestRegistry {
        self.shared.lock().roster().clone()
    }
    
    pub fn is_active(&self) -> bool {
        self.shared.lock().is_active()
    }
    
    /// Receiver that observes a fresh snapshot after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.shared.snapshots.subscribe()
    }
    
    /// Waits until the current run publishes its summary.
    ///
    /// Returns `None` if no run is active when called, or if the run is
    /// reset, replaced or the service shuts down first.
    pub async fn wait_for_summary(&self) -> Option<Summary> {
        let mut rx = self.subscribe();
        let run = {
            let engine = self.shared.lock();
            if !engine.is_active() {
                return None;
            }
            engine.run_id()
        };
        loop {
            {
                let engine = self.shared.lock();
                if engine.run_id() != run {
                    return None;
                }
                if let Some(summary) = engine.summary() {
                    return Some(summary.clone());
                }
            }
            if rx.changed().await.is_err() {
                return None;
            }
        }
    }
}

impl<Ctx> Drop for ChoreographyService<Ctx>
where
    Ctx: ChoreoContext,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Driver loop: fire due steps, then sleep until the next deadline or until
/// an entry point changes the schedule.
async fn drive<Ctx: ChoreoContext>(context: Arc<Ctx>, shared: Arc<Shared>) {
    debug!("choreography driver started");
    
    while !shared.shutdown.load(Ordering::SeqCst) {
        let deadline = {
            let mut engine = shared.lock();
            if engine.advance_to(context.now()) > 0 {
                shared.publish(&engine);
            }
            engine.next_deadline()
        };
        
        match deadline {
            Some(at) => {
                let wait = at.saturating_sub(context.now());
                tokio::select! {
                    _ = context.sleep(wait) => {}
                    _ = shared.wake.notified() => {}
                }
            }
            None => shared.wake.notified().await,
        }
    }
    
    debug!("choreography driver stopped");
}
