//! Pulse collection agent library.
//!
//! The agent periodically samples metrics through a set of collectors,
//! aggregates them in an in-process buffer, and ships snapshots to the
//! collector server through a set of exporters. Collectors and exporters
//! each embed a capacity-bounded [`worker::Worker`] so cycles never overlap
//! and shutdown can join in-flight work.

pub mod buffer;
pub mod collectors;
pub mod config;
pub mod exporters;
pub mod scheduler;
pub mod worker;

pub use buffer::MetricBuffer;
pub use config::AgentConfig;
pub use scheduler::Agent;
pub use worker::Worker;
