//! RSVP Deterministic Simulation Harness
//!
//! Runs the choreography engine on a virtual clock so that every run is a
//! pure function of one 64-bit seed.
//!
//! # Core Principle
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: `SimContext` owns a virtual clock; `SimWorld` advances it in fixed ticks
//! - **Randomness**: guest decisions and invitation ids come from ChaCha8 streams derived from the seed
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      SimWorld                        │
//! │   SimContext (virtual clock + seeded RNG streams)    │
//! │        │ tick                                        │
//! │   ┌────▼──────────────┐        ┌──────────────────┐  │
//! │   │   Choreography    │──────► │ SimExport frames │  │
//! │   │ (host/coord/guest)│snapshot└──────────────────┘  │
//! │   └───────────────────┘                              │
//! └──────────────────────────────────────────────────────┘
//!              ▲
//!        ScenarioRunner (assertions per ScenarioId)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use rsvp_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::ResetMidRun);
//! assert!(result.passed);
//! ```

mod context;
mod world;
mod runner;
mod exporter;
mod error;
mod live;
pub mod scenarios;

pub use context::SimContext;
pub use world::{SimWorld, SimConfig};
pub use runner::{ScenarioRunner, ScenarioResult, ScenarioMetrics};
pub use exporter::{changes, SimExport, SimFrame, MessageFrame, SummaryFrame, SimEvent};
pub use error::SimError;
pub use live::run_live;
