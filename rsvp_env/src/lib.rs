//! RSVP Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" abstraction allowing the choreography
//! engine to run against both a **live** clock (tokio) and a **virtual** one
//! (simulation).
//!
//! # Core Concept: The Reactor Pattern
//!
//! The engine never touches time or entropy directly:
//! - Time (`now()`, `sleep()`, `system_time()`)
//! - Randomness (`derive_rng()`)
//!
//! By deriving all entropy from a single 64-bit seed, any surprising guest
//! decision becomes reproducible via its seed number.
//!
//! # Example
//!
//! ```ignore
//! use rsvp_env::ChoreoContext;
//!
//! async fn driver<Ctx: ChoreoContext>(ctx: &Ctx) {
//!     loop {
//!         fire_due_steps(ctx.now());
//!         ctx.sleep(Duration::from_millis(100)).await;
//!     }
//! }
//! ```

mod context;
mod types;
mod error;
mod tokio_impl;

pub use context::ChoreoContext;
pub use types::{uuid_from_rng, unix_millis, MessageId, MessageIdGen, RunId};
pub use error::EnvError;
pub use tokio_impl::TokioContext;
