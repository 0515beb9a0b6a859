use async_trait::async_trait;
use pulse_core::Metric;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{MetricsRepository, Pingable, StorageError};

/// In-memory repository: a reader/writer-locked map of name to latest
/// metric. Reads run concurrently; writes are exclusive.
#[derive(Default)]
pub struct MemoryRepository {
    metrics: RwLock<HashMap<String, Metric>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricsRepository for MemoryRepository {
    async fn store(&self, metric: Metric) -> Result<(), StorageError> {
        let mut map = self.metrics.write().await;
        map.insert(metric.name().to_string(), metric);
        Ok(())
    }

    async fn store_many(&self, metrics: Vec<Metric>) -> Result<(), StorageError> {
        let mut map = self.metrics.write().await;
        for metric in metrics {
            map.insert(metric.name().to_string(), metric);
        }
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Metric>, StorageError> {
        Ok(self.metrics.read().await.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<Metric>, StorageError> {
        Ok(self.metrics.read().await.values().cloned().collect())
    }
}

#[async_trait]
impl Pingable for MemoryRepository {
    async fn ping(&self) -> bool {
        true
    }
}
