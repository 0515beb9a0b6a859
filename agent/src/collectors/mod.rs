//! Metric collectors.
//!
//! A collector produces one snapshot of metrics per invocation and owns a
//! [`Worker`] that the scheduler reserves around each invocation, so a slow
//! collector can never run on top of itself.

use async_trait::async_trait;
use pulse_core::Metric;
use thiserror::Error;

use crate::worker::Worker;

mod poll_count;
mod random;
mod system;

pub use poll_count::PollCountCollector;
pub use random::{InvalidRange, RandomCollector};
pub use system::SystemCollector;

/// Name of the counter tracking how many collect cycles have run.
pub const POLL_COUNT: &str = "PollCount";
/// Name of the synthetic random gauge.
pub const RANDOM_VALUE: &str = "RandomValue";

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("process {0} not visible to the system sampler")]
    ProcessNotFound(u32),
}

#[async_trait]
pub trait Collector: Send + Sync {
    fn worker(&self) -> &Worker;

    fn name(&self) -> &str {
        self.worker().name()
    }

    /// Produce one metric snapshot. Each call is independent; a failure is
    /// advisory and only costs this cycle's samples.
    async fn collect(&self) -> Result<Vec<Metric>, CollectError>;
}
