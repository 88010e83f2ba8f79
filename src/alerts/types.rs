//! Alert types and data structures

use crate::metrics::{MetricType, Tags};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "info"),
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Error => write!(f, "error"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Comparison operators for alert rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "gte")]
    GreaterThanOrEqual,
    #[serde(rename = "lt")]
    LessThan,
    #[serde(rename = "lte")]
    LessThanOrEqual,
    #[serde(rename = "eq")]
    Equal,
    #[serde(rename = "neq")]
    NotEqual,
}

impl std::fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonOperator::GreaterThan => write!(f, "gt"),
            ComparisonOperator::GreaterThanOrEqual => write!(f, "gte"),
            ComparisonOperator::LessThan => write!(f, "lt"),
            ComparisonOperator::LessThanOrEqual => write!(f, "lte"),
            ComparisonOperator::Equal => write!(f, "eq"),
            ComparisonOperator::NotEqual => write!(f, "neq"),
        }
    }
}

/// Alert rule evaluated against the metric source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    /// Rule ID (unique)
    pub id: String,
    /// Rule name, used in rendered alert messages
    pub name: String,
    /// Metric name to read
    pub metric: String,
    /// Which accessor to read the metric through
    pub metric_type: MetricType,
    /// Percentile for histogram/timing reads; defaults to p95
    #[serde(default)]
    pub percentile: Option<f64>,
    /// Comparison operator
    pub operator: ComparisonOperator,
    /// Threshold value
    pub threshold: f64,
    /// Alert severity
    pub severity: AlertSeverity,
    /// Minimum time between successive firings of this rule
    pub cooldown: Duration,
    /// Whether the rule is evaluated
    #[serde(default = "default_rule_enabled")]
    pub enabled: bool,
    /// Tags selecting the metric key to read; empty when absent
    #[serde(default)]
    pub tag_filter: Option<Tags>,
}

fn default_rule_enabled() -> bool {
    true
}

/// Alert raised by a rule whose condition transitioned to breached
#[derive(Debug, Clone, Serialize)]
pub struct TriggeredAlert {
    /// Alert ID
    pub id: String,
    /// ID of the rule that fired
    pub rule_id: String,
    /// Rendered human-readable message
    pub message: String,
    /// Metric value observed at firing time
    pub current_value: f64,
    /// Threshold the value was compared against
    pub threshold: f64,
    /// Severity inherited from the rule
    pub severity: AlertSeverity,
    /// Firing timestamp
    pub timestamp: DateTime<Utc>,
    /// Whether an operator has acknowledged the alert
    pub acknowledged: bool,
}

/// Alert engine statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct AlertStats {
    /// Total alerts fired since creation
    pub total_fired: u64,
    /// Total alerts resolved since creation
    pub total_resolved: u64,
    /// Number of currently active alerts
    pub active: usize,
    /// Currently active alerts bucketed by severity
    pub active_by_severity: HashMap<String, u64>,
    /// Timestamp of the most recent firing
    pub last_alert: Option<DateTime<Utc>>,
}

/// Callback invoked when an alert fires
pub type AlertCallback = Arc<dyn Fn(&TriggeredAlert) + Send + Sync>;

/// Callbacks wired by the host; configuration carries data only
#[derive(Default)]
pub(super) struct AlertCallbacks {
    /// Invoked on every firing
    pub on_alert: Option<AlertCallback>,
    /// Invoked exactly once per resolution
    pub on_resolve: Option<AlertCallback>,
}

/// Consolidated alert storage - single lock for related data
#[derive(Default)]
pub(super) struct AlertStorage {
    /// Rules in insertion order; evaluation order is deterministic
    pub rules: Vec<AlertRule>,
    /// Active alerts, at most one per rule id
    pub active: HashMap<String, TriggeredAlert>,
    /// Bounded firing history, oldest evicted first
    pub history: VecDeque<TriggeredAlert>,
    /// Cooldown clocks, stamped on firing
    pub last_fired: HashMap<String, Instant>,
    /// Total alerts fired
    pub total_fired: u64,
    /// Total alerts resolved
    pub total_resolved: u64,
    /// Most recent firing timestamp
    pub last_alert: Option<DateTime<Utc>>,
}
