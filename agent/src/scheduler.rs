//! The agent scheduler: two periodic loops and a draining stop.
//!
//! The collect loop dispatches one task per collector on every tick of the
//! collect interval; the export loop, offset by one collect interval so the
//! first snapshot is never empty, dispatches one task per exporter and then
//! flushes the buffer once per cycle. Every dispatched task runs
//! reserve -> operate -> release against its unit's worker, with the
//! reservation wait bounded by that phase's own interval so a stuck unit
//! skips cycles instead of queuing them.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::buffer::MetricBuffer;
use crate::collectors::Collector;
use crate::config::AgentConfig;
use crate::exporters::Exporter;
use pulse_core::Metric;

pub struct Agent {
    collect_interval: Duration,
    export_interval: Duration,
    collectors: Vec<Arc<dyn Collector>>,
    exporters: Vec<Arc<dyn Exporter>>,
    buffer: Arc<MetricBuffer>,
}

impl Agent {
    pub fn new(cfg: &AgentConfig, buffer: Arc<MetricBuffer>) -> Self {
        Self {
            collect_interval: cfg.collect_interval,
            export_interval: cfg.export_interval,
            collectors: Vec::new(),
            exporters: Vec::new(),
            buffer,
        }
    }

    pub fn add_collector(&mut self, collector: Arc<dyn Collector>) {
        self.collectors.push(collector);
    }

    pub fn add_exporter(&mut self, exporter: Arc<dyn Exporter>) {
        self.exporters.push(exporter);
    }

    /// Run both loops until the token is cancelled. Cancellation stops the
    /// ticking immediately; joining in-flight tasks is [`Agent::stop`]'s
    /// job.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let export_side = Arc::clone(&self);
        let export_token = shutdown.clone();
        let warmup = self.collect_interval;
        let export_handle = tokio::spawn(async move {
            // One collect interval of warmup guarantees the first export
            // sees a populated buffer.
            tokio::select! {
                _ = tokio::time::sleep(warmup) => {}
                _ = export_token.cancelled() => return,
            }
            export_side.run_export_loop(export_token).await;
        });

        self.run_collect_loop(shutdown).await;
        let _ = export_handle.await;
    }

    async fn run_collect_loop(&self, shutdown: CancellationToken) {
        let mut ticker = interval_at(
            Instant::now() + self.collect_interval,
            self.collect_interval,
        );
        let mut cycle: u64 = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    cycle += 1;
                    debug!("collect cycle {cycle}");
                    for collector in &self.collectors {
                        let collector = Arc::clone(collector);
                        let buffer = Arc::clone(&self.buffer);
                        let wait = self.collect_interval;
                        tokio::spawn(async move {
                            collect_one(collector, buffer, wait).await;
                        });
                    }
                }
                _ = shutdown.cancelled() => {
                    debug!("collect loop cancelled");
                    return;
                }
            }
        }
    }

    async fn run_export_loop(&self, shutdown: CancellationToken) {
        let mut ticker = interval_at(
            Instant::now() + self.export_interval,
            self.export_interval,
        );
        let mut cycle: u64 = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    cycle += 1;
                    debug!("export cycle {cycle}");
                    // One snapshot per cycle; every exporter ships the same
                    // view of the buffer.
                    let snapshot = self.buffer.retrieve().await;
                    for exporter in &self.exporters {
                        let exporter = Arc::clone(exporter);
                        let snapshot = snapshot.clone();
                        let wait = self.export_interval;
                        tokio::spawn(async move {
                            export_one(exporter, snapshot, wait).await;
                        });
                    }
                    // Flushed once per cycle, even when exporters failed:
                    // delivery is best effort, the next cycle is the retry.
                    self.buffer.flush().await;
                }
                _ = shutdown.cancelled() => {
                    debug!("export loop cancelled");
                    return;
                }
            }
        }
    }

    /// Drain every unit's worker, blocking until in-flight collections and
    /// exports have released their slots. Bounds shutdown by in-flight
    /// work rather than a fixed sleep.
    pub async fn stop(&self, wait: Duration) {
        for collector in &self.collectors {
            if let Err(err) = collector.worker().drain(wait).await {
                warn!("{} collector did not drain: {err}", collector.name());
            }
        }
        for exporter in &self.exporters {
            if let Err(err) = exporter.worker().drain(wait).await {
                warn!("{} exporter did not drain: {err}", exporter.name());
            }
        }
    }
}

async fn collect_one(collector: Arc<dyn Collector>, buffer: Arc<MetricBuffer>, wait: Duration) {
    if let Err(err) = collector.worker().reserve(wait).await {
        warn!("{} collector skipped this cycle: {err}", collector.name());
        return;
    }

    match collector.collect().await {
        Ok(metrics) => buffer.buffer(metrics).await,
        Err(err) => error!("{} collector failed: {err}", collector.name()),
    }

    if let Err(err) = collector.worker().release() {
        error!("{} collector release failed: {err}", collector.name());
    }
}

async fn export_one(exporter: Arc<dyn Exporter>, snapshot: Vec<Metric>, wait: Duration) {
    if let Err(err) = exporter.worker().reserve(wait).await {
        warn!("{} exporter skipped this cycle: {err}", exporter.name());
        return;
    }

    if let Err(err) = exporter.export(&snapshot).await {
        error!("{} exporter failed: {err}", exporter.name());
    }

    if let Err(err) = exporter.worker().release() {
        error!("{} exporter release failed: {err}", exporter.name());
    }
}
