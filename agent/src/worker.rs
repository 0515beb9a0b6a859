//! Named, capacity-bounded reservation primitive.
//!
//! A `Worker` guards a unit of periodic work (a collector or an exporter)
//! with `max_slots` execution slots, typically one. Callers must `reserve`
//! a slot before running the protected operation and `release` it after,
//! success or failure. Draining a worker -- reserving every slot in
//! sequence -- doubles as a join barrier over in-flight executions during
//! shutdown.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::debug;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{name} worker still busy after {waited:?}")]
    Busy { name: String, waited: Duration },

    /// Release was called with every slot already available. Under correct
    /// reserve/release pairing this cannot happen; it indicates a defect in
    /// the calling code, not a runtime condition to recover from.
    #[error("{name} worker already fully idle (unpaired release)")]
    AlreadyIdle { name: String },
}

pub struct Worker {
    name: String,
    max_slots: usize,
    slots: Semaphore,
}

impl Worker {
    pub fn new(name: impl Into<String>, max_slots: usize) -> Self {
        Self {
            name: name.into(),
            max_slots,
            slots: Semaphore::new(max_slots),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_slots(&self) -> usize {
        self.max_slots
    }

    /// Take one execution slot, waiting up to `wait` for one to free up.
    /// On timeout, no slot is consumed and the protected operation must
    /// not proceed.
    pub async fn reserve(&self, wait: Duration) -> Result<(), WorkerError> {
        match timeout(wait, self.slots.acquire()).await {
            Ok(Ok(permit)) => {
                permit.forget();
                debug!("{} worker reserved", self.name);
                Ok(())
            }
            // The semaphore is never closed; treat it the same as a timeout.
            Ok(Err(_)) | Err(_) => Err(WorkerError::Busy {
                name: self.name.clone(),
                waited: wait,
            }),
        }
    }

    /// Return a previously reserved slot to the pool.
    pub fn release(&self) -> Result<(), WorkerError> {
        if self.slots.available_permits() >= self.max_slots {
            return Err(WorkerError::AlreadyIdle {
                name: self.name.clone(),
            });
        }
        self.slots.add_permits(1);
        debug!("{} worker released", self.name);
        Ok(())
    }

    /// Reserve every slot in sequence, blocking until all in-flight
    /// executions have released. The slots are intentionally not returned:
    /// a drained worker stays unusable, which is exactly what shutdown
    /// wants.
    pub async fn drain(&self, wait: Duration) -> Result<(), WorkerError> {
        for _ in 0..self.max_slots {
            self.reserve(wait).await?;
        }
        debug!("{} worker drained", self.name);
        Ok(())
    }
}
