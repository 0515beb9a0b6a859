use async_trait::async_trait;
use pulse_core::Metric;
use rand::Rng;
use thiserror::Error;

use super::{CollectError, Collector, RANDOM_VALUE};
use crate::config::RandomCollectorConfig;
use crate::worker::Worker;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidRange {
    #[error("random bounds cannot be negative")]
    NegativeBound,

    #[error("random lower bound {min} exceeds upper bound {max}")]
    MinOverMax { min: i64, max: i64 },
}

/// Emits one `Gauge(RandomValue, v)` per cycle with `v` drawn uniformly
/// from the configured `[min, max]` range.
pub struct RandomCollector {
    worker: Worker,
    min: i64,
    max: i64,
}

impl RandomCollector {
    pub fn new(
        name: impl Into<String>,
        cfg: &RandomCollectorConfig,
    ) -> Result<Self, InvalidRange> {
        if cfg.min < 0 || cfg.max < 0 {
            return Err(InvalidRange::NegativeBound);
        }
        if cfg.min > cfg.max {
            return Err(InvalidRange::MinOverMax {
                min: cfg.min,
                max: cfg.max,
            });
        }
        Ok(Self {
            worker: Worker::new(name, 1),
            min: cfg.min,
            max: cfg.max,
        })
    }
}

#[async_trait]
impl Collector for RandomCollector {
    fn worker(&self) -> &Worker {
        &self.worker
    }

    async fn collect(&self) -> Result<Vec<Metric>, CollectError> {
        let value = rand::thread_rng().gen_range(self.min..=self.max);
        Ok(vec![Metric::gauge(RANDOM_VALUE, value as f64)])
    }
}
