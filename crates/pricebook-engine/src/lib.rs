//! Pricebook Engine — the event-sourcing replication engine.
//!
//! Maintains an always-current, immutable [`pricebook_core::state::PricingState`]
//! by resuming from the latest snapshot, filling any retention gap from the
//! capture archive, then tailing the live log with exactly-once effective
//! application. A sibling scheduler persists fresh snapshots on a cadence.

pub mod config;
pub mod engine;
pub mod scheduler;

pub use config::{EngineConfig, MalformedEventPolicy, SnapshotPolicy};
pub use engine::ReplicationEngine;
pub use scheduler::SnapshotScheduler;
