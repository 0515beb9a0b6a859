//! Metric exporters.
//!
//! An exporter consumes a buffer snapshot per invocation and ships it
//! somewhere -- a log line, the collector server. Like collectors, each
//! exporter owns a [`Worker`] so a slow export cannot overlap the next
//! cycle's.

use async_trait::async_trait;
use pulse_core::Metric;
use thiserror::Error;

use crate::worker::Worker;

mod http;
mod log;

pub use self::http::HttpExporter;
pub use self::log::LogExporter;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server rejected batch: status {status}, body '{body}'")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Exporter: Send + Sync {
    fn worker(&self) -> &Worker;

    fn name(&self) -> &str {
        self.worker().name()
    }

    /// Ship one snapshot. Failures are reported, not retried; the next
    /// scheduled cycle is the retry.
    async fn export(&self, metrics: &[Metric]) -> Result<(), ExportError>;
}
