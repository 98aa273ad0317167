//! # gaffer_core - Deterministic Event-Sourced League Simulation
//!
//! The hard core of the gaffer football simulator:
//!
//! - Seeded, splittable random streams (`rng`)
//! - An append-only event log over embedded sqlite (`store`)
//! - The domain model with a single `apply` mutation path (`models`)
//! - The minute-tick match engine (`engine`)
//! - Double round-robin scheduling (`schedule`)
//! - The matchday orchestrator, the only write path (`orchestrator`)
//! - Soft-state validation for LLM collaborator proposals (`softstate`)
//! - Read-side projections (`query`)
//!
//! Everything downstream of a `(seed, event log)` pair is reproducible:
//! no wall clock, no host entropy, no map-iteration order anywhere in the
//! simulation path.

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod query;
pub mod rng;
pub mod schedule;
pub mod softstate;
pub mod store;

pub use config::Config;
pub use error::{CoreError, Result};
pub use models::{Event, EventPayload, World};
pub use orchestrator::{AdvanceStatus, AdvanceSummary, SimContext};
pub use store::EventStore;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
