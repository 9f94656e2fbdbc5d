//! Scenario runner - executes deterministic choreography scenarios.

use crate::exporter::SimExport;
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld};

use rsvp_core::summary::tally;
use rsvp_core::{ChoreoError, ChoreographyConfig, MessageStatus, SummaryPolicy};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in milliseconds
    pub final_time_ms: u64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenarioMetrics {
    /// Steps fired by the engine
    pub steps_fired: u64,

    /// Messages in the ledger at the end
    pub messages: usize,

    /// Status transitions journaled at the end
    pub transitions: usize,

    /// Responses recorded at the end
    pub responses: usize,

    /// Submissions the engine refused
    pub rejected_submissions: u64,

    /// Final tally, zero when no summary was published
    pub yes: usize,
    pub no: usize,
    pub maybe: usize,
}

type Outcome = Result<(), String>;

/// Runs choreography scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Virtual time per tick
    tick: Duration,

    /// Engine configuration shared by every scenario
    config: ChoreographyConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner with the reference configuration.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            tick: Duration::from_millis(50),
            config: ChoreographyConfig::default(),
        }
    }

    /// Sets the tick length.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Replaces the engine configuration.
    pub fn with_config(mut self, config: ChoreographyConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the summary policy.
    pub fn with_policy(mut self, policy: SummaryPolicy) -> Self {
        self.config.summary_policy = policy;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, false).0
    }

    /// Runs a scenario while recording its timeline.
    pub fn run_with_export(&self, scenario: ScenarioId) -> (ScenarioResult, Option<SimExport>) {
        self.execute(scenario, true)
    }

    fn execute(&self, scenario: ScenarioId, export: bool) -> (ScenarioResult, Option<SimExport>) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let mut choreography = self.config.clone();
        if scenario == ScenarioId::ResampleSummary {
            choreography.summary_policy = SummaryPolicy::Resample;
        }
        let run_length = choreography
            .registry()
            .map(|roster| choreography.timings.run_length(roster.len(), roster.max_reaction_delay()))
            .unwrap_or_default();

        let config = SimConfig {
            seed: self.seed,
            tick: self.tick,
            max_duration: (run_length * 3).max(Duration::from_secs(10)),
            choreography,
        };

        let mut world = match SimWorld::new(config) {
            Ok(world) => world,
            Err(e) => {
                warn!("world setup failed: {}", e);
                return (self.failed_setup(scenario, e), None);
            }
        };
        if export {
            world.enable_export(scenario.name());
        }

        let mut metrics = ScenarioMetrics::default();
        let outcome = match scenario {
            ScenarioId::FullRun => self.run_full_run(&mut world),
            ScenarioId::ResetImmediately => self.run_reset_immediately(&mut world, run_length),
            ScenarioId::ResetMidRun => self.run_reset_mid_run(&mut world, run_length),
            ScenarioId::ConcurrentSubmit => self.run_concurrent_submit(&mut world, &mut metrics),
            ScenarioId::BackToBack => self.run_back_to_back(&mut world),
            ScenarioId::Restart => self.run_restart(&mut world, run_length),
            ScenarioId::ResampleSummary => self.run_full_run(&mut world),
            ScenarioId::InvalidInvitation => self.run_invalid_invitation(&mut world, &mut metrics),
        };

        let engine = world.engine();
        metrics.steps_fired = world.steps_fired();
        metrics.messages = engine.messages().len();
        metrics.transitions = engine.transitions().len();
        metrics.responses = engine.responses().len();
        if let Some(summary) = engine.summary() {
            metrics.yes = summary.yes_count;
            metrics.no = summary.no_count;
            metrics.maybe = summary.maybe_count;
        }

        let failure_reason = outcome.err();
        let passed = failure_reason.is_none();
        let mut export = world.take_export();
        if let Some(export) = export.as_mut() {
            export.finalize(passed, failure_reason.clone());
        }

        info!(
            "{} {}: {} steps, {} messages, {} transitions",
            if passed { "✓" } else { "✗" },
            scenario.name(),
            metrics.steps_fired,
            metrics.messages,
            metrics.transitions
        );

        let result = ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            total_ticks: world.tick_count(),
            final_time_ms: world.now().as_millis() as u64,
            failure_reason,
            metrics,
        };
        (result, export)
    }

    fn failed_setup(&self, scenario: ScenarioId, error: ChoreoError) -> ScenarioResult {
        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: false,
            total_ticks: 0,
            final_time_ms: 0,
            failure_reason: Some(format!("setup failed: {}", error)),
            metrics: ScenarioMetrics::default(),
        }
    }

    /// SIM-001 / SIM-007: one run from invitation to summary.
    fn run_full_run(&self, world: &mut SimWorld) -> Outcome {
        let invitation = world.invitation("Summer Launch Party", "Sarah");
        world.submit(invitation).map_err(|e| e.to_string())?;

        if !world.run_until_idle() {
            return Err(format!("run still active at {:?}", world.now()));
        }
        check_complete(world)?;

        let timings = world.engine().timings().clone();
        let roster = world.engine().roster();
        let bound = timings.run_length(roster.len(), roster.max_reaction_delay()) + self.tick;
        if world.now() > bound {
            return Err(format!("run took {:?}, expected at most {:?}", world.now(), bound));
        }
        Ok(())
    }

    /// SIM-002: cancel before the first step fires.
    fn run_reset_immediately(&self, world: &mut SimWorld, run_length: Duration) -> Outcome {
        let invitation = world.invitation("Summer Launch Party", "Sarah");
        world.submit(invitation).map_err(|e| e.to_string())?;
        world.reset();

        world.run_for(run_length + Duration::from_secs(1));
        check_empty(world)
    }

    /// SIM-003: cancel with responses in flight.
    fn run_reset_mid_run(&self, world: &mut SimWorld, run_length: Duration) -> Outcome {
        let invitation = world.invitation("Summer Launch Party", "Sarah");
        world.submit(invitation).map_err(|e| e.to_string())?;

        world.run_until(run_length / 2);
        let in_flight = world.engine().messages().len();
        if in_flight <= 1 {
            return Err(format!("only {} messages before reset", in_flight));
        }
        debug!("  resetting with {} messages in flight", in_flight);

        world.reset();
        world.run_for(run_length);
        check_empty(world)
    }

    /// SIM-004: the second submission must leave the active run untouched.
    fn run_concurrent_submit(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Outcome {
        let first = world.invitation("Summer Launch Party", "Sarah");
        let first_id = first.id;
        world.submit(first).map_err(|e| e.to_string())?;

        world.run_for(Duration::from_secs(1));
        let before = world.engine().snapshot();

        let second = world.invitation("Winter Gala", "Marcus");
        match world.submit(second) {
            Err(ChoreoError::RunInProgress(_)) => metrics.rejected_submissions += 1,
            Err(e) => return Err(format!("unexpected error: {}", e)),
            Ok(run) => return Err(format!("second submission accepted as {}", run)),
        }
        if world.engine().snapshot() != before {
            return Err("rejected submission changed the run state".to_string());
        }

        if !world.run_until_idle() {
            return Err(format!("run still active at {:?}", world.now()));
        }
        check_complete(world)?;
        check_summary_for(world, first_id)
    }

    /// SIM-005: the second run must not inherit the first run's ledger.
    fn run_back_to_back(&self, world: &mut SimWorld) -> Outcome {
        for event in ["Summer Launch Party", "Winter Gala"] {
            let invitation = world.invitation(event, "Sarah");
            let id = invitation.id;
            world.submit(invitation).map_err(|e| e.to_string())?;

            if !world.run_until_idle() {
                return Err(format!("{} still active at {:?}", event, world.now()));
            }
            check_complete(world)?;
            check_summary_for(world, id)?;
        }
        Ok(())
    }

    /// SIM-006: restart replaces the active run.
    fn run_restart(&self, world: &mut SimWorld, run_length: Duration) -> Outcome {
        let first = world.invitation("Summer Launch Party", "Sarah");
        world.submit(first).map_err(|e| e.to_string())?;
        world.run_until(run_length / 2);

        let second = world.invitation("Winter Gala", "Marcus");
        let second_id = second.id;
        world.restart(second).map_err(|e| e.to_string())?;

        if !world.run_until_idle() {
            return Err(format!("restarted run still active at {:?}", world.now()));
        }
        check_complete(world)?;
        check_summary_for(world, second_id)
    }

    /// SIM-008: an invitation without an event name never starts a run.
    fn run_invalid_invitation(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Outcome {
        let invitation = world.invitation("", "Sarah");
        match world.submit(invitation) {
            Err(ChoreoError::InvalidInvitation(_)) => metrics.rejected_submissions += 1,
            Err(e) => return Err(format!("unexpected error: {}", e)),
            Ok(run) => return Err(format!("invalid invitation accepted as {}", run)),
        }

        world.run_for(Duration::from_secs(1));
        check_empty(world)
    }
}

/// A finished run: every hop processed, one response per guest, summary published.
fn check_complete(world: &SimWorld) -> Outcome {
    let engine = world.engine();
    let guests = engine.roster().len();

    let expected = 2 * guests + 2;
    if engine.messages().len() != expected {
        return Err(format!("{} messages, expected {}", engine.messages().len(), expected));
    }
    if let Some(message) = engine.messages().iter().find(|m| m.status != MessageStatus::Processed) {
        return Err(format!("{} left {}", message.id, message.status));
    }
    if let Some(t) = engine.transitions().iter().find(|t| t.to <= t.from) {
        return Err(format!("{} moved backwards: {} -> {}", t.message, t.from, t.to));
    }
    if !engine.status().is_idle() {
        return Err(format!("actors not idle: {:?}", engine.status()));
    }

    let responders: HashSet<&str> = engine.responses().iter().map(|r| r.guest_id.as_str()).collect();
    if engine.responses().len() != guests || responders.len() != guests {
        return Err(format!(
            "{} responses from {} guests, expected {}",
            engine.responses().len(),
            responders.len(),
            guests
        ));
    }

    let summary = engine.summary().ok_or("no summary published")?;
    if summary.total_invited != guests || summary.total_responses != guests {
        return Err(format!(
            "summary counts {}/{} invited/responded, expected {}",
            summary.total_invited, summary.total_responses, guests
        ));
    }
    if summary.yes_count + summary.no_count + summary.maybe_count != guests {
        return Err("summary tally does not cover every guest".to_string());
    }
    if world.config.choreography.summary_policy == SummaryPolicy::Recorded {
        let recorded = tally(engine.responses());
        if recorded != (summary.yes_count, summary.no_count, summary.maybe_count) {
            return Err(format!("summary {:?} disagrees with recorded {:?}",
                (summary.yes_count, summary.no_count, summary.maybe_count), recorded));
        }
    }
    Ok(())
}

/// Nothing left of any run.
fn check_empty(world: &SimWorld) -> Outcome {
    let engine = world.engine();
    if !engine.messages().is_empty() {
        return Err(format!("{} messages survived", engine.messages().len()));
    }
    if !engine.responses().is_empty() || engine.summary().is_some() {
        return Err("responses or summary survived".to_string());
    }
    if engine.current_invitation().is_some() {
        return Err("invitation survived".to_string());
    }
    if !engine.status().is_idle() {
        return Err(format!("actors not idle: {:?}", engine.status()));
    }
    if engine.pending_steps() != 0 {
        return Err(format!("{} steps still pending", engine.pending_steps()));
    }
    Ok(())
}

fn check_summary_for(world: &SimWorld, invitation_id: Uuid) -> Outcome {
    match world.engine().summary() {
        Some(summary) if summary.invitation_id == invitation_id => Ok(()),
        Some(summary) => Err(format!("summary is for {}, expected {}", summary.invitation_id, invitation_id)),
        None => Err("no summary published".to_string()),
    }
}
