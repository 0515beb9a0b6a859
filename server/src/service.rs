//! Metrics service: the authoritative store's access layer.
//!
//! Applies the same counter/gauge merge semantics as the agent's buffer,
//! but against persistent state. Counter updates run inside a single
//! service-wide critical section spanning read-merge-write, preventing
//! lost increments under concurrency; gauge updates skip it because
//! last-write-wins commutes under any interleaving.

use pulse_core::{merge_batch, Metric};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::backup::FileBackuper;
use crate::storage::{MetricsRepository, StorageError};

pub struct MetricsService {
    repo: Arc<dyn MetricsRepository>,
    update_lock: Mutex<()>,
}

impl MetricsService {
    pub fn new(repo: Arc<dyn MetricsRepository>) -> Self {
        Self {
            repo,
            update_lock: Mutex::new(()),
        }
    }

    /// Merge one metric into the store and return the stored result.
    pub async fn update(&self, metric: Metric) -> Result<Metric, StorageError> {
        if metric.is_counter() {
            let _guard = self.update_lock.lock().await;
            self.apply(metric).await
        } else {
            self.apply(metric).await
        }
    }

    /// Merge a batch: collapse same-name entries first so a batch cannot
    /// lose its own updates, then merge against the store. The critical
    /// section is only taken when the batch contains a counter.
    pub async fn update_many(&self, metrics: Vec<Metric>) -> Result<Vec<Metric>, StorageError> {
        let metrics = merge_batch(metrics)?;
        if metrics.iter().any(Metric::is_counter) {
            let _guard = self.update_lock.lock().await;
            self.apply_many(metrics).await
        } else {
            self.apply_many(metrics).await
        }
    }

    pub async fn get(&self, name: &str) -> Result<Option<Metric>, StorageError> {
        self.repo.get(name).await
    }

    pub async fn list(&self) -> Result<Vec<Metric>, StorageError> {
        self.repo.list().await
    }

    async fn apply(&self, metric: Metric) -> Result<Metric, StorageError> {
        let stored = match self.repo.get(metric.name()).await? {
            Some(mut existing) => {
                existing.merge(&metric)?;
                existing
            }
            None => metric,
        };
        self.repo.store(stored.clone()).await?;
        Ok(stored)
    }

    async fn apply_many(&self, metrics: Vec<Metric>) -> Result<Vec<Metric>, StorageError> {
        let mut stored = Vec::with_capacity(metrics.len());
        for metric in metrics {
            let merged = match self.repo.get(metric.name()).await? {
                Some(mut existing) => {
                    existing.merge(&metric)?;
                    existing
                }
                None => metric,
            };
            stored.push(merged);
        }
        self.repo.store_many(stored.clone()).await?;
        Ok(stored)
    }

    /// Seed the repository from the last durable snapshot, applying every
    /// restored metric through the normal update path. Returns how many
    /// metrics were restored.
    pub async fn restore_from(&self, backuper: &FileBackuper) -> Result<usize, StorageError> {
        let metrics = backuper.restore().await?;
        let count = metrics.len();
        for metric in metrics {
            self.update(metric).await?;
        }
        info!("Restored {count} metrics from backup");
        Ok(count)
    }

    /// Snapshot the full metric set to the backup file on a fixed interval
    /// until cancellation. Failures are logged and skipped; the previous
    /// cycle's snapshot stays durable.
    pub fn spawn_backup_task(
        self: &Arc<Self>,
        backuper: Arc<FileBackuper>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            let mut cycle: u64 = 0;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        cycle += 1;
                        let metrics = match service.list().await {
                            Ok(metrics) => metrics,
                            Err(err) => {
                                error!("backup cycle {cycle} failed to list metrics: {err}");
                                continue;
                            }
                        };
                        match backuper.backup(&metrics).await {
                            Ok(()) => debug!(
                                "backup cycle {cycle} wrote {} metrics to {:?}",
                                metrics.len(),
                                backuper.path()
                            ),
                            Err(err) => error!("backup cycle {cycle} failed: {err}"),
                        }
                    }
                    _ = shutdown.cancelled() => {
                        debug!("backup task cancelled");
                        return;
                    }
                }
            }
        })
    }
}
