//! Repository traits and shared storage error type.

use async_trait::async_trait;
use pulse_core::{Metric, MetricError};
use thiserror::Error;

mod memory;

pub use memory::MemoryRepository;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Metric(#[from] MetricError),
}

/// The server's authoritative metric store. Implementations hold the
/// latest value per name; merge semantics live in the service layer above,
/// so `store` is a plain upsert.
#[async_trait]
pub trait MetricsRepository: Send + Sync {
    async fn store(&self, metric: Metric) -> Result<(), StorageError>;

    async fn store_many(&self, metrics: Vec<Metric>) -> Result<(), StorageError>;

    async fn get(&self, name: &str) -> Result<Option<Metric>, StorageError>;

    async fn list(&self) -> Result<Vec<Metric>, StorageError>;
}

/// Liveness probe for backing components, surfaced through `GET /ping`.
#[async_trait]
pub trait Pingable: Send + Sync {
    async fn ping(&self) -> bool;
}
