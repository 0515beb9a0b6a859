use async_trait::async_trait;
use pulse_core::{Metric, MetricHasher, MetricPayload};
use std::time::Instant;
use tracing::info;

use super::{ExportError, Exporter};
use crate::config::HttpExporterConfig;
use crate::worker::Worker;

/// Ships snapshots to the collector server: single metrics through
/// `POST /update`, batches through `POST /updates`. When a hasher is
/// configured every payload carries an HMAC signature.
pub struct HttpExporter {
    worker: Worker,
    update_url: String,
    updates_url: String,
    client: reqwest::Client,
    hasher: Option<MetricHasher>,
}

impl HttpExporter {
    pub fn new(
        name: impl Into<String>,
        cfg: &HttpExporterConfig,
        hasher: Option<MetricHasher>,
    ) -> Result<Self, ExportError> {
        let client = reqwest::Client::builder().timeout(cfg.timeout).build()?;
        Ok(Self {
            worker: Worker::new(name, 1),
            update_url: format!("http://{}/update", cfg.address),
            updates_url: format!("http://{}/updates", cfg.address),
            client,
            hasher,
        })
    }
}

#[async_trait]
impl Exporter for HttpExporter {
    fn worker(&self) -> &Worker {
        &self.worker
    }

    async fn export(&self, metrics: &[Metric]) -> Result<(), ExportError> {
        if metrics.is_empty() {
            return Ok(());
        }

        let hasher = self.hasher.as_ref();
        let started = Instant::now();

        let response = if let [metric] = metrics {
            let payload = MetricPayload::from_metric(metric, hasher);
            self.client.post(&self.update_url).json(&payload).send().await?
        } else {
            let batch: Vec<MetricPayload> = metrics
                .iter()
                .map(|m| MetricPayload::from_metric(m, hasher))
                .collect();
            self.client.post(&self.updates_url).json(&batch).send().await?
        };

        let elapsed = started.elapsed();
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(256).collect(),
            });
        }

        info!(
            "exported {} metrics, status {} in {}ms",
            metrics.len(),
            status.as_u16(),
            elapsed.as_millis()
        );
        Ok(())
    }
}
