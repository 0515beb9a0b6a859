//! Metric domain model and merge semantics.
//!
//! A metric is a name bound to exactly one kind of value for its lifetime:
//! a monotonically accumulating `Counter` or a last-write-wins `Gauge`.
//! Submitting an existing name with the other kind is a conflict and is
//! rejected with a typed error rather than silently aliasing fields.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricError {
    #[error("metric kind conflict for '{name}'")]
    KindConflict { name: String },

    #[error("invalid metric kind '{0}'")]
    InvalidKind(String),
}

/// Closed set of metric kinds. Merge, rendering and wire encoding all
/// match exhaustively on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }

    pub fn parse(s: &str) -> Result<Self, MetricError> {
        match s {
            "counter" => Ok(MetricKind::Counter),
            "gauge" => Ok(MetricKind::Gauge),
            other => Err(MetricError::InvalidKind(other.to_string())),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific metric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum MetricValue {
    Counter(i64),
    Gauge(f64),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Counter(_) => MetricKind::Counter,
            MetricValue::Gauge(_) => MetricKind::Gauge,
        }
    }
}

/// A named metric sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    name: String,
    #[serde(flatten)]
    value: MetricValue,
}

impl Metric {
    pub fn counter(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::Counter(value),
        }
    }

    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::Gauge(value),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> MetricValue {
        self.value
    }

    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }

    pub fn is_counter(&self) -> bool {
        self.kind() == MetricKind::Counter
    }

    /// Merge `incoming` into this metric: counters add, gauges replace.
    /// The two metrics must share a name and a kind.
    pub fn merge(&mut self, incoming: &Metric) -> Result<(), MetricError> {
        match (&mut self.value, incoming.value) {
            (MetricValue::Counter(current), MetricValue::Counter(delta)) => {
                *current += delta;
                Ok(())
            }
            (MetricValue::Gauge(current), MetricValue::Gauge(new)) => {
                *current = new;
                Ok(())
            }
            _ => Err(MetricError::KindConflict {
                name: self.name.clone(),
            }),
        }
    }

    /// Canonical text rendering of the value: decimal integer for counters,
    /// fixed-precision decimal with trailing zeros trimmed for gauges
    /// (`10.333`, `10.0` -- never trimmed past the decimal point).
    pub fn display_value(&self) -> String {
        match self.value {
            MetricValue::Counter(v) => v.to_string(),
            MetricValue::Gauge(v) => {
                let mut s = format!("{v:.6}");
                while s.ends_with('0') {
                    s.pop();
                }
                if s.ends_with('.') {
                    s.push('0');
                }
                s
            }
        }
    }
}

/// Collapse same-name entries within one batch before it is merged against
/// a store: counters sum, gauges take the last occurrence. First-occurrence
/// order is preserved. A name carrying both kinds within the batch is a
/// conflict.
pub fn merge_batch(metrics: Vec<Metric>) -> Result<Vec<Metric>, MetricError> {
    let mut merged: Vec<Metric> = Vec::with_capacity(metrics.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(metrics.len());

    for metric in metrics {
        match index.get(metric.name()) {
            Some(&i) => merged[i].merge(&metric)?,
            None => {
                index.insert(metric.name().to_string(), merged.len());
                merged.push(metric);
            }
        }
    }
    Ok(merged)
}
