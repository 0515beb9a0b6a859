//! HMAC signing and verification of metric update requests.
//!
//! The signature covers a canonical `name:kind:value` string; counters
//! render as decimal integers, gauges in fixed 6-decimal form. The gauge
//! rendering is deliberately untrimmed (`10.333000`) -- trimming it would
//! silently invalidate every signature produced by existing agents.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::metric::{Metric, MetricValue};

type HmacSha256 = Hmac<Sha256>;

/// Signs metrics and verifies inbound signatures with a shared key.
#[derive(Clone)]
pub struct MetricHasher {
    key: Vec<u8>,
}

impl MetricHasher {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.as_bytes().to_vec(),
        }
    }

    /// Hex-encoded HMAC-SHA256 over the metric's canonical representation.
    pub fn hash(&self, metric: &Metric) -> String {
        let payload = match metric.value() {
            MetricValue::Counter(v) => format!("{}:counter:{}", metric.name(), v),
            MetricValue::Gauge(v) => format!("{}:gauge:{v:.6}", metric.name()),
        };

        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC accepts keys of any length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Recompute and compare in constant time. Rejection of mismatches is
    /// the caller's job; this only reports the verdict.
    pub fn check(&self, metric: &Metric, signature: &str) -> bool {
        let expected = self.hash(metric);
        expected.as_bytes().ct_eq(signature.as_bytes()).into()
    }
}
