use async_trait::async_trait;
use pulse_core::Metric;

use super::{CollectError, Collector, POLL_COUNT};
use crate::worker::Worker;

/// Emits `Counter(PollCount, 1)` every cycle; the aggregation path turns
/// the stream of ones into a running poll count.
pub struct PollCountCollector {
    worker: Worker,
}

impl PollCountCollector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            worker: Worker::new(name, 1),
        }
    }
}

#[async_trait]
impl Collector for PollCountCollector {
    fn worker(&self) -> &Worker {
        &self.worker
    }

    async fn collect(&self) -> Result<Vec<Metric>, CollectError> {
        Ok(vec![Metric::counter(POLL_COUNT, 1)])
    }
}
