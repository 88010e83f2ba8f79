//! Type definitions for metric aggregation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tags attached to a metric observation
///
/// A `BTreeMap` keeps tag keys sorted, so the same tag set always produces
/// the same metric key regardless of insertion order.
pub type Tags = BTreeMap<String, String>;

/// Build a tag map from key/value pairs
pub fn tags<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Tags
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Kind of metric an aggregation tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// Monotonically increasing cumulative value
    Counter,
    /// Point-in-time value, overwritten on every set
    Gauge,
    /// Distribution of raw values over a bounded window
    Histogram,
    /// Duration distribution; a histogram with an implicit unit marker
    Timing,
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricType::Counter => write!(f, "counter"),
            MetricType::Gauge => write!(f, "gauge"),
            MetricType::Histogram => write!(f, "histogram"),
            MetricType::Timing => write!(f, "timing"),
        }
    }
}

/// Rolling aggregate for one metric key
///
/// Created on the first observation for a key, updated on every subsequent
/// one, and removed only by an explicit reset.
#[derive(Debug, Clone, Serialize)]
pub struct MetricAggregation {
    /// Metric name
    pub name: String,
    /// Metric kind
    pub metric_type: MetricType,
    /// Number of observations
    pub count: u64,
    /// Sum of observed values
    pub sum: f64,
    /// Smallest observed value
    pub min: f64,
    /// Largest observed value
    pub max: f64,
    /// Mean of observed values (sum / count)
    pub avg: f64,
    /// Most recent observed value
    pub last: f64,
    /// Wall-clock time of the most recent observation
    pub last_updated: DateTime<Utc>,
    /// Canonical tag set for this key
    pub tags: Tags,
}

impl MetricAggregation {
    /// Start a new aggregation from a first observation
    pub(super) fn first(name: &str, metric_type: MetricType, value: f64, tags: &Tags) -> Self {
        Self {
            name: name.to_string(),
            metric_type,
            count: 1,
            sum: value,
            min: value,
            max: value,
            avg: value,
            last: value,
            last_updated: Utc::now(),
            tags: tags.clone(),
        }
    }

    /// Fold one more observation into the aggregate
    pub(super) fn observe(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.avg = self.sum / self.count as f64;
        self.last = value;
        self.last_updated = Utc::now();
    }
}

/// Immutable copy of the aggregator state at one instant
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Capture timestamp
    pub captured_at: DateTime<Utc>,
    /// Elapsed time since the aggregator started (or was last reset)
    pub uptime_ms: u64,
    /// All aggregations, by metric key
    pub aggregations: std::collections::HashMap<String, MetricAggregation>,
    /// Cumulative counter values, by metric key
    pub counters: std::collections::HashMap<String, f64>,
    /// Current gauge values, by metric key
    pub gauges: std::collections::HashMap<String, f64>,
    /// Histogram buffers, by metric key, in insertion order
    pub histograms: std::collections::HashMap<String, Vec<f64>>,
}

/// Canonical key for a `(name, tag set)` pair
///
/// Tag keys come out of the `BTreeMap` already sorted, so two observations
/// with the same tags always land in the same bucket.
pub(crate) fn metric_key(name: &str, tags: &Tags) -> String {
    if tags.is_empty() {
        return name.to_string();
    }
    let rendered: Vec<String> = tags.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{}{{{}}}", name, rendered.join(","))
}
