//! Choreography - the delayed state machine driving one RSVP run.
//!
//! A run is a fixed pipeline of timed steps. Every step is an independent
//! entry in the [`StepQueue`], scheduled relative to the fire time of the
//! step that created it:
//!
//! ```text
//! t0            submit: host active, Host→Coordinator appended
//! t0+800        invitation delivered: host processing, coordinator active
//! t1=t0+1800    invitation processed: coordinator processing, guests active,
//!               one Coordinator→Guest message per guest
//! t1+500+i·200  fan-out i delivered, +300 processed
//! t1+2000+d(g)  guest g decides, Guest→Coordinator appended
//!               +500 delivered, +300 processed and recorded
//! t1+3000+max d guests processing
//!               +1000 summary built, Coordinator→Host appended
//!               +800 delivered, +500 processed: summary published, all idle
//! ```
//!
//! The engine is synchronous and clock-free: callers pass `now` in and
//! call [`Choreography::advance_to`] to fire due steps. `ChoreographyService`
//! wraps it with a timer-driven task.

use rand::RngCore;
use rsvp_env::{MessageId, RunId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{ChoreographyConfig, ChoreographyTimings, SummaryPolicy};
use crate::decision::decide;
use crate::error::ChoreoError;
use crate::ledger::{MessageLedger, StatusTransition};
use crate::model::{Endpoint, Invitation, Message, MessageStatus, Payload, Response, Summary};
use crate::roster::GuestRegistry;
use crate::scheduler::StepQueue;
use crate::status::{ActorStatus, StatusTracker, SystemStatus};
use crate::summary::{build_summary, summarize};

/// One timed transition of the pipeline.
#[derive(Debug, Clone)]
pub enum Step {
    DeliverInvitation { message: MessageId, invitation: Invitation },
    ProcessInvitation { message: MessageId, invitation: Invitation },
    DeliverFanOut { message: MessageId },
    ProcessFanOut { message: MessageId },
    GuestDecides { guest: usize, invitation: Invitation },
    DeliverResponse { message: MessageId },
    RecordResponse { message: MessageId, response: Response },
    CloseResponses { invitation: Invitation },
    PublishSummary { invitation: Invitation },
    DeliverSummary { message: MessageId },
    CompleteRun { message: MessageId, summary: Summary },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::DeliverInvitation { .. } => "deliver_invitation",
            Step::ProcessInvitation { .. } => "process_invitation",
            Step::DeliverFanOut { .. } => "deliver_fanout",
            Step::ProcessFanOut { .. } => "process_fanout",
            Step::GuestDecides { .. } => "guest_decides",
            Step::DeliverResponse { .. } => "deliver_response",
            Step::RecordResponse { .. } => "record_response",
            Step::CloseResponses { .. } => "close_responses",
            Step::PublishSummary { .. } => "publish_summary",
            Step::DeliverSummary { .. } => "deliver_summary",
            Step::CompleteRun { .. } => "complete_run",
        }
    }
}

/// Read-only view of the run state handed to consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub invitation: Option<Invitation>,
    pub responses: Vec<Response>,
    pub summary: Option<Summary>,
    pub status: SystemStatus,
    pub messages: Vec<Message>,
}

/// The choreography engine. Sole mutator of the run state.
pub struct Choreography {
    timings: ChoreographyTimings,
    policy: SummaryPolicy,
    roster: GuestRegistry,
    rng: Box<dyn RngCore + Send>,
    
    /// Wall-clock milliseconds at `now == 0`
    epoch_ms: u64,
    
    run: RunId,
    queue: StepQueue<Step>,
    ledger: MessageLedger,
    status: StatusTracker,
    current_invitation: Option<Invitation>,
    responses: Vec<Response>,
    summary: Option<Summary>,
}

impl Choreography {
    /// Creates an idle engine.
    ///
    /// `rng` feeds every guest decision and generated id; `epoch_ms` maps
    /// the engine clock onto wall-clock timestamps.
    pub fn new(
        config: ChoreographyConfig,
        rng: Box<dyn RngCore + Send>,
        epoch_ms: u64,
    ) -> Result<Self, ChoreoError> {
        config.validate()?;
        let roster = config.registry()?;
        
        Ok(Self {
            timings: config.timings,
            policy: config.summary_policy,
            roster,
            rng,
            epoch_ms,
            run: RunId::INITIAL,
            queue: StepQueue::new(),
            ledger: MessageLedger::new(),
            status: StatusTracker::new(),
            current_invitation: None,
            responses: Vec::new(),
            summary: None,
        })
    }
    
    // =========================================================================
    // ENTRY POINTS
    // =========================================================================
    
    /// Starts a run at `now`.
    ///
    /// Rejected with `RunInProgress` while the host is not idle; existing
    /// state is left untouched in that case.
    pub fn submit_invitation(&mut self, invitation: Invitation, now: Duration) -> Result<RunId, ChoreoError> {
        let host = self.status.snapshot().host;
        if host != ActorStatus::Idle {
            warn!(run = %self.run, %host, "submission rejected while a run is active");
            return Err(ChoreoError::RunInProgress(host));
        }
        invitation.validate()?;
        
        self.clear_run();
        info!(
            run = %self.run,
            event = %invitation.event_name,
            host = %invitation.host_name,
            guests = self.roster.len(),
            "choreography started"
        );
        
        self.status.set_host(ActorStatus::Active);
        let created_at_ms = self.timestamp(now);
        let message = self.ledger.append(
            Endpoint::Host,
            Endpoint::Coordinator,
            Payload::Invitation(invitation.clone()),
            created_at_ms,
        );
        let delay = self.timings.host_delivery;
        self.after(now, delay, Step::DeliverInvitation { message: message.id, invitation });
        
        Ok(self.run)
    }
    
    /// Resets, then starts a run with `invitation`.
    pub fn restart(&mut self, invitation: Invitation, now: Duration) -> Result<RunId, ChoreoError> {
        invitation.validate()?;
        self.reset();
        self.submit_invitation(invitation, now)
    }
    
    /// Cancels every pending step and clears all run state. Always succeeds.
    pub fn reset(&mut self) {
        let dropped = self.clear_run();
        info!(run = %self.run, cancelled_steps = dropped, "choreography reset");
    }
    
    /// Fires every step due at or before `now`, in fire-time order.
    ///
    /// Steps scheduled by a fired step that are themselves due by `now` fire
    /// in the same call. Returns the number of steps fired.
    pub fn advance_to(&mut self, now: Duration) -> usize {
        let mut fired = 0;
        while let Some(scheduled) = self.queue.pop_due(now) {
            // Only reachable if a step outlives `clear_run`
            if scheduled.run != self.run {
                warn!(
                    stale = %scheduled.run,
                    current = %self.run,
                    step = scheduled.step.name(),
                    "discarding step from a cancelled run"
                );
                continue;
            }
            debug!(
                run = %self.run,
                step = scheduled.step.name(),
                at_ms = scheduled.fire_at.as_millis() as u64,
                "step fired"
            );
            self.fire(scheduled.fire_at, scheduled.step);
            fired += 1;
        }
        fired
    }
    
    // =========================================================================
    // ACCESSORS
    // =========================================================================
    
    pub fn current_invitation(&self) -> Option<&Invitation> {
        self.current_invitation.as_ref()
    }
    
    /// Responses recorded so far, in arrival order.
    pub fn responses(&self) -> &[Response] {
        &self.responses
    }
    
    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }
    
    pub fn status(&self) -> SystemStatus {
        self.status.snapshot()
    }
    
    pub fn messages(&self) -> &[Message] {
        self.ledger.all()
    }
    
    pub fn transitions(&self) -> &[StatusTransition] {
        self.ledger.transitions()
    }
    
    pub fn roster(&self) -> &GuestRegistry {
        &self.roster
    }
    
    pub fn timings(&self) -> &ChoreographyTimings {
        &self.timings
    }
    
    pub fn run_id(&self) -> RunId {
        self.run
    }
    
    /// True while a run has not yet published its summary.
    pub fn is_active(&self) -> bool {
        self.status.snapshot().host != ActorStatus::Idle
    }
    
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.next_deadline()
    }
    
    pub fn pending_steps(&self) -> usize {
        self.queue.len()
    }
    
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            invitation: self.current_invitation.clone(),
            responses: self.responses.clone(),
            summary: self.summary.clone(),
            status: self.status.snapshot(),
            messages: self.ledger.all().to_vec(),
        }
    }
    
    // =========================================================================
    // INTERNALS
    // =========================================================================
    
    /// Moves to a fresh run generation with nothing pending.
    fn clear_run(&mut self) -> usize {
        let dropped = self.queue.cancel_all();
        self.run = self.run.next();
        self.ledger.clear();
        self.status.reset();
        self.current_invitation = None;
        self.responses.clear();
        self.summary = None;
        dropped
    }
    
    fn timestamp(&self, at: Duration) -> u64 {
        let offset = u64::try_from(at.as_millis()).unwrap_or(u64::MAX);
        self.epoch_ms.saturating_add(offset)
    }
    
    fn after(&mut self, at: Duration, delay: Duration, step: Step) {
        self.queue.schedule(self.run, at + delay, step);
    }
    
    fn mark(&mut self, message: MessageId, status: MessageStatus, at: Duration) {
        let at_ms = self.timestamp(at);
        self.ledger.set_status(message, status, at_ms);
    }
    
    fn fire(&mut self, at: Duration, step: Step) {
        let t = self.timings.clone();
        let now_ms = self.timestamp(at);
        
        match step {
            Step::DeliverInvitation { message, invitation } => {
                self.mark(message, MessageStatus::Delivered, at);
                self.status.set_host(ActorStatus::Processing);
                self.status.set_coordinator(ActorStatus::Active);
                self.after(at, t.coordinator_processing, Step::ProcessInvitation { message, invitation });
            }
            
            Step::ProcessInvitation { message, invitation } => {
                self.mark(message, MessageStatus::Processed, at);
                self.current_invitation = Some(invitation.clone());
                self.status.set_coordinator(ActorStatus::Processing);
                self.status.set_guests(ActorStatus::Active);
                self.fan_out(at, &invitation);
            }
            
            Step::DeliverFanOut { message } => {
                self.mark(message, MessageStatus::Delivered, at);
                self.after(at, t.fanout_processing, Step::ProcessFanOut { message });
            }
            
            Step::ProcessFanOut { message } => {
                self.mark(message, MessageStatus::Processed, at);
            }
            
            Step::GuestDecides { guest, invitation } => {
                let Some(guest) = self.roster.get(guest).cloned() else {
                    warn!(index = guest, "guest index outside roster");
                    return;
                };
                let response = decide(&guest, &invitation, &mut *self.rng, now_ms);
                debug!(guest = %guest.name, decision = %response.decision, "guest decided");
                
                let message = self.ledger.append(
                    Endpoint::Guest(guest.name.clone()),
                    Endpoint::Coordinator,
                    Payload::Response(response.clone()),
                    now_ms,
                );
                self.after(at, t.response_delivery, Step::DeliverResponse { message: message.id });
                self.after(
                    at,
                    t.response_delivery + t.response_processing,
                    Step::RecordResponse { message: message.id, response },
                );
            }
            
            Step::DeliverResponse { message } => {
                self.mark(message, MessageStatus::Delivered, at);
            }
            
            Step::RecordResponse { message, response } => {
                self.mark(message, MessageStatus::Processed, at);
                self.record_response(response);
            }
            
            Step::CloseResponses { invitation } => {
                self.status.set_guests(ActorStatus::Processing);
                self.after(at, t.summary_build, Step::PublishSummary { invitation });
            }
            
            Step::PublishSummary { invitation } => {
                if self.responses.len() < self.roster.len() {
                    warn!(
                        recorded = self.responses.len(),
                        expected = self.roster.len(),
                        "responses still outstanding, deferring summary"
                    );
                    self.after(at, t.summary_build, Step::PublishSummary { invitation });
                    return;
                }
                
                let summary = self.build_summary(&invitation, at);
                info!(
                    run = %self.run,
                    yes = summary.yes_count,
                    no = summary.no_count,
                    maybe = summary.maybe_count,
                    "summary built"
                );
                let message = self.ledger.append(
                    Endpoint::Coordinator,
                    Endpoint::Host,
                    Payload::Summary(summary.clone()),
                    now_ms,
                );
                self.after(at, t.summary_delivery, Step::DeliverSummary { message: message.id });
                self.after(
                    at,
                    t.summary_delivery + t.summary_processing,
                    Step::CompleteRun { message: message.id, summary },
                );
            }
            
            Step::DeliverSummary { message } => {
                self.mark(message, MessageStatus::Delivered, at);
            }
            
            Step::CompleteRun { message, summary } => {
                self.mark(message, MessageStatus::Processed, at);
                self.summary = Some(summary);
                self.status.reset();
                info!(run = %self.run, messages = self.ledger.len(), "choreography complete");
            }
        }
    }
    
    /// Forwards the invitation to every guest and arms the per-guest and
    /// completion steps.
    fn fan_out(&mut self, at: Duration, invitation: &Invitation) {
        let t = self.timings.clone();
        let now_ms = self.timestamp(at);
        let guests: Vec<(usize, String, Duration)> = self
            .roster
            .list()
            .iter()
            .enumerate()
            .map(|(i, g)| (i, g.name.clone(), g.reaction_delay()))
            .collect();
        
        for (index, name, _) in &guests {
            let message = self.ledger.append(
                Endpoint::Coordinator,
                Endpoint::Guest(name.clone()),
                Payload::Invitation(invitation.clone()),
                now_ms,
            );
            let offset = t.fanout_base + t.fanout_stagger * (*index as u32);
            self.after(at, offset, Step::DeliverFanOut { message: message.id });
        }
        
        for (index, _, reaction) in &guests {
            self.after(
                at,
                t.response_base + *reaction,
                Step::GuestDecides { guest: *index, invitation: invitation.clone() },
            );
        }
        
        let slowest = self.roster.max_reaction_delay();
        self.after(
            at,
            t.completion_gate + slowest,
            Step::CloseResponses { invitation: invitation.clone() },
        );
    }
    
    /// Records a response unless this guest already has one.
    fn record_response(&mut self, response: Response) {
        if self.responses.iter().any(|r| r.guest_id == response.guest_id) {
            warn!(guest = %response.guest_name, "duplicate response ignored");
            return;
        }
        self.responses.push(response);
    }
    
    fn build_summary(&mut self, invitation: &Invitation, at: Duration) -> Summary {
        let created_at_ms = self.timestamp(at);
        match self.policy {
            SummaryPolicy::Recorded => summarize(
                invitation,
                self.roster.len(),
                self.responses.clone(),
                &mut *self.rng,
                created_at_ms,
            ),
            SummaryPolicy::Resample => build_summary(invitation, &self.roster, &mut *self.rng, created_at_ms),
        }
    }
}

impl std::fmt::Debug for Choreography {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Choreography")
            .field("run", &self.run)
            .field("status", &self.status.snapshot())
            .field("messages", &self.ledger.len())
            .field("responses", &self.responses.len())
            .field("pending_steps", &self.queue.len())
            .finish()
    }
}
