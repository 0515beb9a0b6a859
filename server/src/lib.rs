//! Pulse collector server library.
//!
//! The server receives metric updates from agents over HTTP, merges them
//! into a pluggable repository with the same counter/gauge semantics the
//! agent applies locally, snapshots the full metric set to a backup file on
//! an interval, and serves the current values back out.

pub mod api;
pub mod backup;
pub mod config;
pub mod service;
pub mod storage;

pub use backup::FileBackuper;
pub use config::ServerConfig;
pub use service::MetricsService;
pub use storage::{MemoryRepository, MetricsRepository, Pingable, StorageError};
