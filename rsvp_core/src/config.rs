//! Engine configuration: hop latencies, summary policy, optional roster.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ChoreoError;
use crate::model::Guest;
use crate::roster::GuestRegistry;

/// Every fixed delay of the choreography.
///
/// Serialized as integer milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoreographyTimings {
    /// Host → Coordinator: sending → delivered
    #[serde(with = "serde_millis")]
    pub host_delivery: Duration,
    
    /// Host → Coordinator: delivered → processed
    #[serde(with = "serde_millis")]
    pub coordinator_processing: Duration,
    
    /// Fan-out: base delay before the first guest's copy is delivered
    #[serde(with = "serde_millis")]
    pub fanout_base: Duration,
    
    /// Fan-out: additional delay per roster position
    #[serde(with = "serde_millis")]
    pub fanout_stagger: Duration,
    
    /// Fan-out: delivered → processed
    #[serde(with = "serde_millis")]
    pub fanout_processing: Duration,
    
    /// Guest decision: fixed offset added to each guest's reaction delay
    #[serde(with = "serde_millis")]
    pub response_base: Duration,
    
    /// Guest → Coordinator: sending → delivered
    #[serde(with = "serde_millis")]
    pub response_delivery: Duration,
    
    /// Guest → Coordinator: delivered → processed (response recorded)
    #[serde(with = "serde_millis")]
    pub response_processing: Duration,
    
    /// Completion gate: fixed offset added to the slowest reaction delay
    #[serde(with = "serde_millis")]
    pub completion_gate: Duration,
    
    /// Gate → summary built and published
    #[serde(with = "serde_millis")]
    pub summary_build: Duration,
    
    /// Coordinator → Host: sending → delivered
    #[serde(with = "serde_millis")]
    pub summary_delivery: Duration,
    
    /// Coordinator → Host: delivered → processed
    #[serde(with = "serde_millis")]
    pub summary_processing: Duration,
}

impl Default for ChoreographyTimings {
    fn default() -> Self {
        Self {
            host_delivery: Duration::from_millis(800),
            coordinator_processing: Duration::from_millis(1000),
            fanout_base: Duration::from_millis(500),
            fanout_stagger: Duration::from_millis(200),
            fanout_processing: Duration::from_millis(300),
            response_base: Duration::from_millis(2000),
            response_delivery: Duration::from_millis(500),
            response_processing: Duration::from_millis(300),
            completion_gate: Duration::from_millis(3000),
            summary_build: Duration::from_millis(1000),
            summary_delivery: Duration::from_millis(800),
            summary_processing: Duration::from_millis(500),
        }
    }
}

impl ChoreographyTimings {
    /// Time from a guest's decision step until its response is recorded.
    pub fn response_settle(&self) -> Duration {
        self.response_delivery + self.response_processing
    }
    
    /// Upper bound on a full run for a roster whose slowest guest takes
    /// `max_reaction` to answer.
    pub fn run_length(&self, roster_len: usize, max_reaction: Duration) -> Duration {
        let last_fanout = self.fanout_base
            + self.fanout_stagger * roster_len.saturating_sub(1) as u32
            + self.fanout_processing;
        let gate_tail = self.completion_gate
            + max_reaction
            + self.summary_build
            + self.summary_delivery
            + self.summary_processing;
        
        self.host_delivery + self.coordinator_processing + last_fanout.max(gate_tail)
    }
}

/// Where the summary's per-guest outcomes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryPolicy {
    /// Use the responses recorded during the run
    #[default]
    Recorded,
    
    /// Re-run the decision model for every guest when building the summary
    Resample,
}

impl std::str::FromStr for SummaryPolicy {
    type Err = String;
    
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recorded" => Ok(SummaryPolicy::Recorded),
            "resample" => Ok(SummaryPolicy::Resample),
            _ => Err(format!("Unknown summary policy: {}", s)),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoreographyConfig {
    pub timings: ChoreographyTimings,
    
    pub summary_policy: SummaryPolicy,
    
    /// Replaces the reference roster when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roster: Option<Vec<Guest>>,
}

impl ChoreographyConfig {
    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ChoreoError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
    
    /// Reads and parses a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ChoreoError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
    
    /// Builds the guest registry this configuration describes.
    pub fn registry(&self) -> Result<GuestRegistry, ChoreoError> {
        match &self.roster {
            Some(guests) => GuestRegistry::new(guests.clone()),
            None => Ok(GuestRegistry::reference()),
        }
    }
    
    /// Checks that the gate cannot fire before every response is recorded.
    ///
    /// Guest `g` is recorded at `response_base + delay(g) + response_settle`
    /// after the coordinator processes the invitation; the gate fires at
    /// `completion_gate + max(delay)`.
    pub fn validate(&self) -> Result<(), ChoreoError> {
        let registry = self.registry()?;
        let t = &self.timings;
        
        if t.completion_gate <= t.response_base + t.response_settle() {
            return Err(ChoreoError::invalid_config(format!(
                "completion_gate ({}ms) must exceed response_base + response_delivery + response_processing ({}ms)",
                t.completion_gate.as_millis(),
                (t.response_base + t.response_settle()).as_millis(),
            )));
        }
        
        let mut ids: Vec<&str> = registry.list().iter().map(|g| g.id.as_str()).collect();
        ids.sort_unstable();
        if ids.windows(2).any(|w| w[0] == w[1]) {
            return Err(ChoreoError::invalid_config("guest ids must be unique"));
        }
        
        Ok(())
    }
}

/// `Duration` as integer milliseconds.
pub mod serde_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;
    
    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_millis() as u64)
    }
    
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tendency;
    
    #[test]
    fn test_default_config_is_valid() {
        let config = ChoreographyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.summary_policy, SummaryPolicy::Recorded);
        assert_eq!(config.registry().unwrap().len(), 5);
    }
    
    #[test]
    fn test_run_length_reference() {
        let t = ChoreographyTimings::default();
        // 800 + 1000 + (3000 + 4000 + 1000 + 800 + 500)
        assert_eq!(t.run_length(5, Duration::from_millis(4000)), Duration::from_millis(11_100));
    }
    
    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ChoreographyConfig::from_json_str(
            r#"{ "summary_policy": "resample", "timings": { "host_delivery": 10 } }"#,
        )
        .unwrap();
        
        assert_eq!(config.summary_policy, SummaryPolicy::Resample);
        assert_eq!(config.timings.host_delivery, Duration::from_millis(10));
        assert_eq!(config.timings.coordinator_processing, Duration::from_millis(1000));
    }
    
    #[test]
    fn test_custom_roster() {
        let config = ChoreographyConfig::from_json_str(
            r#"{ "roster": [ { "id": "g1", "name": "Ann", "email": "ann@x",
                 "preferences": { "tendency": "maybe", "reaction_delay_ms": 100 } } ] }"#,
        )
        .unwrap();
        
        let registry = config.registry().unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list()[0].preferences.tendency, Tendency::Maybe);
    }
    
    #[test]
    fn test_gate_too_early_rejected() {
        let mut config = ChoreographyConfig::default();
        config.timings.completion_gate = Duration::from_millis(2500);
        assert!(matches!(config.validate(), Err(ChoreoError::InvalidConfig(_))));
    }
    
    #[test]
    fn test_empty_roster_rejected() {
        let err = ChoreographyConfig::from_json_str(r#"{ "roster": [] }"#).unwrap_err();
        assert!(matches!(err, ChoreoError::EmptyRoster));
    }
    
    #[test]
    fn test_duplicate_guest_ids_rejected() {
        let config = ChoreographyConfig {
            roster: Some(vec![
                Guest::new("g", "A", "a@x", Tendency::Yes, 1),
                Guest::new("g", "B", "b@x", Tendency::No, 2),
            ]),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
    
    #[test]
    fn test_bad_json_is_parse_error() {
        let err = ChoreographyConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ChoreoError::ConfigParse(_)));
    }
}
