//! Core domain library for the pulse metrics agent/server pair.
//!
//! Holds the metric model and its merge semantics, the JSON wire payloads
//! exchanged between agent and server, and the HMAC request hasher. This
//! crate performs no I/O; both binaries build on top of it.

pub mod hash;
pub mod metric;
pub mod wire;

pub use hash::MetricHasher;
pub use metric::{merge_batch, Metric, MetricError, MetricKind, MetricValue};
pub use wire::MetricPayload;
