//! JSON wire payloads for the `/update`, `/updates` and `/value` endpoints.
//!
//! The payload shape is `{id, type, delta?, value?, hash?}` with `delta`
//! populated only for counters and `value` only for gauges. Payloads are
//! built per request/response from a domain [`Metric`] and never persisted.

use serde::{Deserialize, Serialize};

use crate::hash::MetricHasher;
use crate::metric::{Metric, MetricError, MetricKind, MetricValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl MetricPayload {
    /// Build an outbound payload, signing it when a hasher is supplied.
    pub fn from_metric(metric: &Metric, hasher: Option<&MetricHasher>) -> Self {
        let (delta, value) = match metric.value() {
            MetricValue::Counter(v) => (Some(v), None),
            MetricValue::Gauge(v) => (None, Some(v)),
        };
        Self {
            id: metric.name().to_string(),
            kind: metric.kind().as_str().to_string(),
            delta,
            value,
            hash: hasher.map(|h| h.hash(metric)),
        }
    }

    /// Decode into a domain metric. An absent value field decodes as the
    /// kind's zero, matching what existing agents send for fresh metrics.
    pub fn to_metric(&self) -> Result<Metric, MetricError> {
        match MetricKind::parse(&self.kind)? {
            MetricKind::Counter => Ok(Metric::counter(&self.id, self.delta.unwrap_or(0))),
            MetricKind::Gauge => Ok(Metric::gauge(&self.id, self.value.unwrap_or(0.0))),
        }
    }

    /// The signature to verify, if one was supplied. Empty strings count
    /// as unsigned for backward compatibility with unsigned agents.
    pub fn signature(&self) -> Option<&str> {
        self.hash.as_deref().filter(|h| !h.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_payload_shape() {
        let hasher = MetricHasher::new("s3cr3t-k3y");
        let payload = MetricPayload::from_metric(&Metric::counter("PollCount", 5), Some(&hasher));
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(
            json,
            r#"{"id":"PollCount","type":"counter","delta":5,"hash":"7148ff92910a879bba42647839901cdd4f9c68f952657e36ead4e894511d82af"}"#
        );
    }

    #[test]
    fn gauge_payload_shape() {
        let payload = MetricPayload::from_metric(&Metric::gauge("Alloc", 10.333), None);
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"id":"Alloc","type":"gauge","value":10.333}"#);
    }

    #[test]
    fn decode_counter() {
        let payload: MetricPayload =
            serde_json::from_str(r#"{"id":"PollCount","type":"counter","delta":5}"#).unwrap();
        assert_eq!(payload.to_metric().unwrap(), Metric::counter("PollCount", 5));
        assert!(payload.signature().is_none());
    }

    #[test]
    fn decode_without_value_defaults_to_zero() {
        let payload: MetricPayload =
            serde_json::from_str(r#"{"id":"Alloc","type":"gauge"}"#).unwrap();
        assert_eq!(payload.to_metric().unwrap(), Metric::gauge("Alloc", 0.0));
    }

    #[test]
    fn decode_unknown_kind_fails() {
        let payload: MetricPayload =
            serde_json::from_str(r#"{"id":"X","type":"summary","delta":1}"#).unwrap();
        assert!(matches!(
            payload.to_metric(),
            Err(MetricError::InvalidKind(k)) if k == "summary"
        ));
    }

    #[test]
    fn empty_hash_counts_as_unsigned() {
        let payload: MetricPayload =
            serde_json::from_str(r#"{"id":"X","type":"counter","delta":1,"hash":""}"#).unwrap();
        assert!(payload.signature().is_none());
    }
}
