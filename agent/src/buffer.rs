//! In-process aggregating buffer bridging collect and export cycles.

use pulse_core::Metric;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::warn;

/// Map of metric name to latest aggregated value. Merges run under an
/// exclusive lock, so a concurrent `retrieve` never observes a partially
/// merged batch.
#[derive(Default)]
pub struct MetricBuffer {
    inner: RwLock<HashMap<String, Metric>>,
}

impl MetricBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a collected snapshot into the buffer: counters add onto the
    /// buffered value, gauges replace it. A sample whose kind disagrees
    /// with what the buffer already holds for that name is dropped with a
    /// warning; the buffered entry wins.
    pub async fn buffer(&self, metrics: Vec<Metric>) {
        let mut map = self.inner.write().await;
        for metric in metrics {
            match map.get_mut(metric.name()) {
                Some(existing) => {
                    if let Err(err) = existing.merge(&metric) {
                        warn!("buffer dropped sample: {err}");
                    }
                }
                None => {
                    map.insert(metric.name().to_string(), metric);
                }
            }
        }
    }

    /// Deep-copied snapshot, safe to mutate independently of the live
    /// buffer.
    pub async fn retrieve(&self) -> Vec<Metric> {
        self.inner.read().await.values().cloned().collect()
    }

    pub async fn flush(&self) {
        self.inner.write().await.clear();
    }
}
