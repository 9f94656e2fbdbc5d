//! Deterministic choreography scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SIM-001: One undisturbed run from invitation to summary
    FullRun,

    /// SIM-002: Reset in the same instant as the submission
    ResetImmediately,

    /// SIM-003: Reset while guests are still deciding
    ResetMidRun,

    /// SIM-004: Second submission while a run is active
    ConcurrentSubmit,

    /// SIM-005: Two complete runs, one after the other
    BackToBack,

    /// SIM-006: Restart with a new invitation mid-run
    Restart,

    /// SIM-007: Summary built by re-running the decision model
    ResampleSummary,

    /// SIM-008: Submission with missing required fields
    InvalidInvitation,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::FullRun,
            ScenarioId::ResetImmediately,
            ScenarioId::ResetMidRun,
            ScenarioId::ConcurrentSubmit,
            ScenarioId::BackToBack,
            ScenarioId::Restart,
            ScenarioId::ResampleSummary,
            ScenarioId::InvalidInvitation,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::FullRun => "full_run",
            ScenarioId::ResetImmediately => "reset_immediately",
            ScenarioId::ResetMidRun => "reset_mid_run",
            ScenarioId::ConcurrentSubmit => "concurrent_submit",
            ScenarioId::BackToBack => "back_to_back",
            ScenarioId::Restart => "restart",
            ScenarioId::ResampleSummary => "resample_summary",
            ScenarioId::InvalidInvitation => "invalid_invitation",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::FullRun => "Invitation to summary, every message processed",
            ScenarioId::ResetImmediately => "Reset at t=0, nothing may fire afterwards",
            ScenarioId::ResetMidRun => "Reset halfway through, state stays empty",
            ScenarioId::ConcurrentSubmit => "Second submit is rejected, first run completes",
            ScenarioId::BackToBack => "Second run starts from a cleared ledger",
            ScenarioId::Restart => "Restart replaces the active run",
            ScenarioId::ResampleSummary => "Resample policy still accounts for every guest",
            ScenarioId::InvalidInvitation => "Empty event name is refused without side effects",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full_run" | "fullrun" | "sim-001" => Ok(ScenarioId::FullRun),
            "reset_immediately" | "resetimmediately" | "sim-002" => Ok(ScenarioId::ResetImmediately),
            "reset_mid_run" | "resetmidrun" | "sim-003" => Ok(ScenarioId::ResetMidRun),
            "concurrent_submit" | "concurrentsubmit" | "sim-004" => Ok(ScenarioId::ConcurrentSubmit),
            "back_to_back" | "backtoback" | "sim-005" => Ok(ScenarioId::BackToBack),
            "restart" | "sim-006" => Ok(ScenarioId::Restart),
            "resample_summary" | "resamplesummary" | "sim-007" => Ok(ScenarioId::ResampleSummary),
            "invalid_invitation" | "invalidinvitation" | "sim-008" => Ok(ScenarioId::InvalidInvitation),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
