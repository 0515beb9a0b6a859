use async_trait::async_trait;
use pulse_core::Metric;
use sysinfo::{Pid, System};
use tokio::sync::Mutex;

use super::{CollectError, Collector};
use crate::worker::Worker;

/// Samples a fixed set of process- and host-level gauges via `sysinfo`:
/// memory and swap figures, the agent process's own footprint and CPU
/// share, and the 1-minute load average.
pub struct SystemCollector {
    worker: Worker,
    system: Mutex<System>,
    pid: Pid,
}

impl SystemCollector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            worker: Worker::new(name, 1),
            system: Mutex::new(System::new_all()),
            pid: Pid::from_u32(std::process::id()),
        }
    }
}

#[async_trait]
impl Collector for SystemCollector {
    fn worker(&self) -> &Worker {
        &self.worker
    }

    async fn collect(&self) -> Result<Vec<Metric>, CollectError> {
        let mut sys = self.system.lock().await;
        sys.refresh_memory();
        sys.refresh_cpu();
        sys.refresh_process(self.pid);

        let process = sys
            .process(self.pid)
            .ok_or(CollectError::ProcessNotFound(self.pid.as_u32()))?;

        Ok(vec![
            Metric::gauge("TotalMemory", sys.total_memory() as f64),
            Metric::gauge("UsedMemory", sys.used_memory() as f64),
            Metric::gauge("AvailableMemory", sys.available_memory() as f64),
            Metric::gauge("TotalSwap", sys.total_swap() as f64),
            Metric::gauge("UsedSwap", sys.used_swap() as f64),
            Metric::gauge("ProcessMemory", process.memory() as f64),
            Metric::gauge("ProcessVirtualMemory", process.virtual_memory() as f64),
            Metric::gauge("ProcessCpu", process.cpu_usage() as f64),
            Metric::gauge("ProcessUptime", process.run_time() as f64),
            Metric::gauge("LoadAverage1", System::load_average().one),
        ])
    }
}
