use async_trait::async_trait;
use pulse_core::Metric;
use tracing::info;

use super::{ExportError, Exporter};
use crate::worker::Worker;

/// Writes each metric as a log line. Useful on its own for local runs and
/// as a liveness signal next to the HTTP exporter.
pub struct LogExporter {
    worker: Worker,
}

impl LogExporter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            worker: Worker::new(name, 1),
        }
    }
}

#[async_trait]
impl Exporter for LogExporter {
    fn worker(&self) -> &Worker {
        &self.worker
    }

    async fn export(&self, metrics: &[Metric]) -> Result<(), ExportError> {
        for metric in metrics {
            info!("{}:{} ({})", metric.name(), metric.display_value(), metric.kind());
        }
        Ok(())
    }
}
