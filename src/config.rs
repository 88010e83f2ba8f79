//! Observability configuration
//!
//! Plain-data configuration for the three components. Callbacks and hooks are
//! code, not configuration; they are registered on the component APIs.

use serde::{Deserialize, Serialize};

/// Top-level observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ObservabilityConfig {
    /// Metric aggregator configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Alert engine configuration
    #[serde(default)]
    pub alerts: AlertEngineConfig,
    /// Event recorder configuration
    #[serde(default)]
    pub recorder: RecorderConfig,
}

impl ObservabilityConfig {
    /// Merge observability configurations
    pub fn merge(mut self, other: Self) -> Self {
        self.metrics = self.metrics.merge(other.metrics);
        self.alerts = self.alerts.merge(other.alerts);
        self.recorder = self.recorder.merge(other.recorder);
        self
    }
}

/// Metric aggregator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metric ingestion
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Capacity of each per-key histogram buffer
    #[serde(default = "default_histogram_capacity")]
    pub histogram_capacity: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            histogram_capacity: default_histogram_capacity(),
        }
    }
}

impl MetricsConfig {
    /// Capacity of the per-key raw counter observation log
    pub fn counter_log_capacity(&self) -> usize {
        self.histogram_capacity.saturating_mul(10)
    }

    /// Merge metrics configurations
    pub fn merge(mut self, other: Self) -> Self {
        if !other.enabled {
            self.enabled = other.enabled;
        }
        if other.histogram_capacity != default_histogram_capacity() {
            self.histogram_capacity = other.histogram_capacity;
        }
        self
    }
}

/// Alert engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEngineConfig {
    /// Enable periodic rule evaluation
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval between evaluation passes, in milliseconds
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,
    /// Capacity of the triggered-alert history
    #[serde(default = "default_max_alerts")]
    pub max_alerts: usize,
    /// Tolerance applied to `Eq`/`Neq` comparisons
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// How a persistently breached rule re-notifies
    #[serde(default)]
    pub renotify: RenotifyPolicy,
}

impl Default for AlertEngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_ms: default_check_interval_ms(),
            max_alerts: default_max_alerts(),
            epsilon: default_epsilon(),
            renotify: RenotifyPolicy::default(),
        }
    }
}

impl AlertEngineConfig {
    /// Merge alert engine configurations
    pub fn merge(mut self, other: Self) -> Self {
        if !other.enabled {
            self.enabled = other.enabled;
        }
        if other.check_interval_ms != default_check_interval_ms() {
            self.check_interval_ms = other.check_interval_ms;
        }
        if other.max_alerts != default_max_alerts() {
            self.max_alerts = other.max_alerts;
        }
        if other.epsilon != default_epsilon() {
            self.epsilon = other.epsilon;
        }
        if other.renotify != RenotifyPolicy::default() {
            self.renotify = other.renotify;
        }
        self
    }
}

/// Re-notification policy for rules that stay breached across checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenotifyPolicy {
    /// Re-fire each time the cooldown elapses while the condition holds
    #[default]
    FixedCadence,
    /// Fire once per breach episode; stay silent until the condition clears
    OnceUntilResolved,
}

/// Event recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Event types the recorder subscribes to (the bus has no wildcard)
    #[serde(default)]
    pub event_types: Vec<String>,
    /// Maximum events retained per recording session
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// Polling interval of the replay pause loop, in milliseconds
    #[serde(default = "default_pause_poll_ms")]
    pub pause_poll_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            event_types: Vec::new(),
            max_events: default_max_events(),
            pause_poll_ms: default_pause_poll_ms(),
        }
    }
}

impl RecorderConfig {
    /// Merge recorder configurations
    pub fn merge(mut self, other: Self) -> Self {
        if !other.event_types.is_empty() {
            self.event_types = other.event_types;
        }
        if other.max_events != default_max_events() {
            self.max_events = other.max_events;
        }
        if other.pause_poll_ms != default_pause_poll_ms() {
            self.pause_poll_ms = other.pause_poll_ms;
        }
        self
    }
}

fn default_true() -> bool {
    true
}

fn default_histogram_capacity() -> usize {
    500
}

fn default_check_interval_ms() -> u64 {
    10_000
}

fn default_max_alerts() -> usize {
    100
}

fn default_epsilon() -> f64 {
    1e-9
}

fn default_max_events() -> usize {
    5_000
}

fn default_pause_poll_ms() -> u64 {
    50
}
