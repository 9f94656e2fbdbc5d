//! SimWorld - The simulation harness container.

use crate::context::SimContext;
use crate::exporter::SimExport;

use rsvp_core::service::DECISION_STREAM;
use rsvp_core::{ChoreoError, Choreography, ChoreographyConfig, Invitation, RunSnapshot};
use rsvp_env::{unix_millis, uuid_from_rng, ChoreoContext, RunId};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// First RNG stream used for invitation ids; each new invitation takes the next one.
const INVITATION_STREAM_BASE: u64 = 1_000;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Virtual time advanced per tick
    pub tick: Duration,

    /// Hard stop for `run_until_idle` (virtual time)
    pub max_duration: Duration,

    /// Engine configuration
    pub choreography: ChoreographyConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick: Duration::from_millis(50),
            max_duration: Duration::from_secs(60),
            choreography: ChoreographyConfig::default(),
        }
    }
}

/// The SimWorld - one choreography engine on a virtual clock.
///
/// Every mutation goes through the world so an attached [`SimExport`]
/// sees each state change.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Shared simulation context (virtual clock)
    pub context: Arc<SimContext>,

    engine: Choreography,

    /// Snapshot after the last observed mutation
    last: RunSnapshot,

    export: Option<SimExport>,

    invitations_issued: u64,
    steps_fired: u64,
    tick_count: u64,
}

impl SimWorld {
    /// Creates a new SimWorld with the given configuration.
    pub fn new(config: SimConfig) -> Result<Self, ChoreoError> {
        let context = SimContext::shared(config.seed);
        let epoch_ms = unix_millis(context.epoch())?;
        let engine = Choreography::new(
            config.choreography.clone(),
            context.derive_rng(DECISION_STREAM),
            epoch_ms,
        )?;

        Ok(Self {
            config,
            context,
            engine,
            last: RunSnapshot::default(),
            export: None,
            invitations_issued: 0,
            steps_fired: 0,
            tick_count: 0,
        })
    }

    /// Starts recording a frame for every observed change.
    pub fn enable_export(&mut self, scenario: &str) {
        self.export = Some(SimExport::new(scenario, self.config.seed));
    }

    /// Detaches the recorded timeline.
    pub fn take_export(&mut self) -> Option<SimExport> {
        self.export.take()
    }

    /// Builds a reproducible invitation stamped with the current virtual time.
    pub fn invitation(&mut self, event_name: &str, host_name: &str) -> Invitation {
        let mut rng = self
            .context
            .derive_rng(INVITATION_STREAM_BASE + self.invitations_issued);
        self.invitations_issued += 1;

        let created_at_ms = self.wall_ms();
        Invitation::new(event_name, "2024-06-14", "18:30", "Rooftop Terrace", host_name, created_at_ms)
            .with_description("Simulated event")
            .with_id(uuid_from_rng(&mut *rng))
    }

    /// Submits an invitation at the current virtual time.
    pub fn submit(&mut self, invitation: Invitation) -> Result<RunId, ChoreoError> {
        let result = self.engine.submit_invitation(invitation, self.context.now());
        self.observe();
        result
    }

    /// Resets and submits at the current virtual time.
    pub fn restart(&mut self, invitation: Invitation) -> Result<RunId, ChoreoError> {
        let result = self.engine.restart(invitation, self.context.now());
        self.observe();
        result
    }

    /// Cancels the current run.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.observe();
    }

    /// Advances simulation by one tick and fires every due step.
    ///
    /// The clock stops at each step deadline inside the tick so every
    /// intermediate state is observed, whatever the tick length.
    pub fn tick(&mut self) -> usize {
        let target = self.context.now() + self.config.tick;
        let mut fired = 0;

        while let Some(deadline) = self.engine.next_deadline().filter(|d| *d <= target) {
            let at = deadline.max(self.context.now());
            self.context.set_time(at.as_nanos() as u64);

            let due = self.engine.advance_to(at);
            if due > 0 {
                fired += due;
                self.observe();
            }
        }

        self.context.set_time(target.as_nanos() as u64);
        self.steps_fired += fired as u64;
        self.tick_count += 1;
        fired
    }

    /// Ticks until the virtual clock reaches `target`.
    pub fn run_until(&mut self, target: Duration) {
        while self.context.now() < target {
            self.tick();
        }
    }

    /// Ticks for `duration` of virtual time.
    pub fn run_for(&mut self, duration: Duration) {
        let target = self.context.now() + duration;
        self.run_until(target);
    }

    /// Ticks until no run is active or `max_duration` is reached.
    ///
    /// Returns true if the engine went idle.
    pub fn run_until_idle(&mut self) -> bool {
        while self.engine.is_active() {
            if self.context.now() >= self.config.max_duration {
                return false;
            }
            self.tick();
        }
        true
    }

    /// The engine under test.
    pub fn engine(&self) -> &Choreography {
        &self.engine
    }

    /// Returns the current simulation time.
    pub fn now(&self) -> Duration {
        self.context.now()
    }

    /// Returns the current tick count.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Total steps fired across all ticks.
    pub fn steps_fired(&self) -> u64 {
        self.steps_fired
    }

    fn wall_ms(&self) -> u64 {
        unix_millis(self.context.system_time()).unwrap_or_default()
    }

    fn observe(&mut self) {
        let next = self.engine.snapshot();
        if let Some(export) = self.export.as_mut() {
            export.record(self.context.now().as_millis() as u64, &self.last, &next);
        }
        debug!(
            t_ms = self.context.now().as_millis() as u64,
            messages = next.messages.len(),
            responses = next.responses.len(),
            "state observed"
        );
        self.last = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsvp_core::MessageStatus;

    #[test]
    fn test_sim_world_creation() {
        let world = SimWorld::new(SimConfig::default()).unwrap();

        assert_eq!(world.tick_count(), 0);
        assert_eq!(world.now(), Duration::ZERO);
        assert!(!world.engine().is_active());
    }

    #[test]
    fn test_sim_world_runs_to_idle() {
        let mut world = SimWorld::new(SimConfig::default()).unwrap();
        let invitation = world.invitation("Launch Party", "Sarah");
        world.submit(invitation).unwrap();

        assert!(world.run_until_idle());
        assert_eq!(world.engine().messages().len(), 12);
        assert!(world
            .engine()
            .messages()
            .iter()
            .all(|m| m.status == MessageStatus::Processed));

        // 11.1 s run with 50 ms ticks
        assert_eq!(world.now(), Duration::from_millis(11_100));
        assert_eq!(world.tick_count(), 222);
    }

    #[test]
    fn test_sim_world_gives_up_at_max_duration() {
        let config = SimConfig {
            max_duration: Duration::from_secs(2),
            ..Default::default()
        };
        let mut world = SimWorld::new(config).unwrap();
        let invitation = world.invitation("Launch Party", "Sarah");
        world.submit(invitation).unwrap();

        assert!(!world.run_until_idle());
        assert!(world.engine().is_active());
    }

    #[test]
    fn test_coarse_tick_observes_every_hop() {
        let config = SimConfig {
            tick: Duration::from_millis(700),
            ..Default::default()
        };
        let mut world = SimWorld::new(config).unwrap();
        world.enable_export("full_run");
        let invitation = world.invitation("Launch Party", "Sarah");
        world.submit(invitation).unwrap();
        assert!(world.run_until_idle());

        let export = world.take_export().unwrap();
        let mut seen = std::collections::HashMap::new();
        for frame in &export.frames {
            for message in &frame.messages {
                let expected = match seen.get(&message.id) {
                    Some(MessageStatus::Sending) => [MessageStatus::Sending, MessageStatus::Delivered],
                    Some(MessageStatus::Delivered) => [MessageStatus::Delivered, MessageStatus::Processed],
                    Some(MessageStatus::Processed) => [MessageStatus::Processed, MessageStatus::Processed],
                    None => [MessageStatus::Sending, MessageStatus::Sending],
                };
                assert!(
                    expected.contains(&message.status),
                    "{} jumped to {} at {}ms",
                    message.id,
                    message.status,
                    frame.time_ms
                );
                seen.insert(message.id, message.status);
            }
        }
        assert_eq!(seen.len(), 12);
        // Frames land on step deadlines, not on tick boundaries
        assert!(export.frames.iter().any(|f| f.time_ms == 800));
    }

    #[test]
    fn test_sim_world_invitations_are_reproducible() {
        let mut a = SimWorld::new(SimConfig::default()).unwrap();
        let mut b = SimWorld::new(SimConfig::default()).unwrap();

        let first = a.invitation("Launch Party", "Sarah");
        assert_eq!(first.id, b.invitation("Launch Party", "Sarah").id);
        assert_ne!(first.id, a.invitation("Launch Party", "Sarah").id);
    }

    #[test]
    fn test_sim_world_export_records_frames() {
        let mut world = SimWorld::new(SimConfig::default()).unwrap();
        world.enable_export("full_run");
        let invitation = world.invitation("Launch Party", "Sarah");
        world.submit(invitation).unwrap();
        world.run_until_idle();

        let export = world.take_export().unwrap();
        assert!(!export.frames.is_empty());
        assert_eq!(export.frames[0].time_ms, 0);
        assert_eq!(export.duration_ms, 11_100);
        assert!(export.frames.last().unwrap().summary.is_some());
    }
}
