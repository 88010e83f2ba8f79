//! Alert engine implementation
//!
//! Evaluates rules against an injected [`MetricSource`] on a timer tick (or
//! on demand) and manages the edge-triggered alert lifecycle with per-rule
//! cooldown.

use super::source::MetricSource;
use super::types::{
    AlertCallback, AlertCallbacks, AlertRule, AlertStats, AlertStorage, AlertSeverity,
    ComparisonOperator, TriggeredAlert,
};
use crate::config::{AlertEngineConfig, RenotifyPolicy};
use crate::metrics::{BoundedPush, MetricType};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Percentile read for histogram/timing rules without an explicit one
const DEFAULT_RULE_PERCENTILE: f64 = 95.0;

/// Alert engine driving rule evaluation and alert lifecycle
pub struct AlertEngine {
    /// Configuration, replaced wholesale by `init`
    config: Arc<RwLock<AlertEngineConfig>>,
    /// Injected metric read capability
    source: Arc<dyn MetricSource>,
    /// Consolidated storage for rules, active alerts, history and cooldowns
    storage: Arc<RwLock<AlertStorage>>,
    /// Host-provided callbacks
    callbacks: Arc<RwLock<AlertCallbacks>>,
    /// Periodic evaluation task; owned and disposable
    timer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl AlertEngine {
    /// Create a new engine reading from `source`
    pub fn new(source: Arc<dyn MetricSource>, config: AlertEngineConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            source,
            storage: Arc::new(RwLock::new(AlertStorage::default())),
            callbacks: Arc::new(RwLock::new(AlertCallbacks::default())),
            timer: Arc::new(Mutex::new(None)),
        }
    }

    /// Register the firing callback
    pub fn on_alert(&self, callback: AlertCallback) {
        self.callbacks.write().on_alert = Some(callback);
    }

    /// Register the resolution callback
    pub fn on_resolve(&self, callback: AlertCallback) {
        self.callbacks.write().on_resolve = Some(callback);
    }

    // ==================== Rule CRUD ====================

    /// Add a rule, replacing any existing rule with the same id in place
    pub fn add_rule(&self, rule: AlertRule) {
        info!("Adding alert rule: {} ({})", rule.name, rule.id);

        let mut storage = self.storage.write();
        match storage.rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule,
            None => storage.rules.push(rule),
        }
    }

    /// Remove a rule and purge its active alert; false for unknown ids
    ///
    /// Purging does not invoke the resolve callback: resolution describes a
    /// condition transition, not rule CRUD.
    pub fn remove_rule(&self, rule_id: &str) -> bool {
        let mut storage = self.storage.write();
        let Some(position) = storage.rules.iter().position(|r| r.id == rule_id) else {
            return false;
        };

        info!("Removing alert rule: {}", rule_id);
        storage.rules.remove(position);
        storage.active.remove(rule_id);
        storage.last_fired.remove(rule_id);
        true
    }

    /// Replace an existing rule; false for unknown ids
    pub fn update_rule(&self, rule: AlertRule) -> bool {
        let mut storage = self.storage.write();
        match storage.rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => {
                *existing = rule;
                true
            }
            None => false,
        }
    }

    /// Flip a rule's enabled flag; false for unknown ids
    pub fn toggle_rule(&self, rule_id: &str) -> bool {
        let mut storage = self.storage.write();
        match storage.rules.iter_mut().find(|r| r.id == rule_id) {
            Some(rule) => {
                rule.enabled = !rule.enabled;
                debug!("Toggled rule {} -> enabled={}", rule_id, rule.enabled);
                true
            }
            None => false,
        }
    }

    // ==================== Evaluation ====================

    /// Run one evaluation pass over all rules, in insertion order
    pub fn check(&self) {
        let (epsilon, renotify, max_alerts) = {
            let config = self.config.read();
            (config.epsilon, config.renotify, config.max_alerts)
        };
        let rules: Vec<AlertRule> = self.storage.read().rules.clone();

        for rule in &rules {
            if !rule.enabled {
                continue;
            }

            let (in_cooldown, has_active) = {
                let storage = self.storage.read();
                let in_cooldown = storage
                    .last_fired
                    .get(&rule.id)
                    .is_some_and(|fired| fired.elapsed() < rule.cooldown);
                (in_cooldown, storage.active.contains_key(&rule.id))
            };
            if in_cooldown {
                continue;
            }

            let value = self.read_value(rule);
            let breached = compare(rule.operator, value, rule.threshold, epsilon);

            if breached {
                if has_active && renotify == RenotifyPolicy::OnceUntilResolved {
                    continue;
                }
                self.fire(rule, value, max_alerts);
            } else if has_active {
                self.resolve(rule);
            }
        }
    }

    /// Read the value a rule compares, selected by its metric type
    fn read_value(&self, rule: &AlertRule) -> f64 {
        let mut tags = rule.tag_filter.clone().unwrap_or_default();
        match rule.metric_type {
            MetricType::Counter => self.source.get_counter(&rule.metric, &tags),
            MetricType::Gauge => self.source.get_gauge(&rule.metric, &tags),
            MetricType::Histogram => self.source.get_percentile(
                &rule.metric,
                rule.percentile.unwrap_or(DEFAULT_RULE_PERCENTILE),
                &tags,
            ),
            MetricType::Timing => {
                // Timings are keyed with the implicit unit marker.
                tags.entry("unit".to_string())
                    .or_insert_with(|| "ms".to_string());
                self.source.get_percentile(
                    &rule.metric,
                    rule.percentile.unwrap_or(DEFAULT_RULE_PERCENTILE),
                    &tags,
                )
            }
        }
    }

    fn fire(&self, rule: &AlertRule, value: f64, max_alerts: usize) {
        let alert = TriggeredAlert {
            id: uuid::Uuid::new_v4().to_string(),
            rule_id: rule.id.clone(),
            message: format!(
                "{}: {} {} {} (current value: {})",
                rule.name, rule.metric, rule.operator, rule.threshold, value
            ),
            current_value: value,
            threshold: rule.threshold,
            severity: rule.severity,
            timestamp: chrono::Utc::now(),
            acknowledged: false,
        };

        {
            let mut storage = self.storage.write();
            storage.active.insert(rule.id.clone(), alert.clone());
            storage.history.push_bounded(alert.clone(), max_alerts);
            storage.last_fired.insert(rule.id.clone(), Instant::now());
            storage.total_fired += 1;
            storage.last_alert = Some(alert.timestamp);
        }

        match rule.severity {
            AlertSeverity::Info => info!("Alert fired: {}", alert.message),
            AlertSeverity::Warning => warn!("Alert fired: {}", alert.message),
            AlertSeverity::Error | AlertSeverity::Critical => {
                error!("Alert fired: {}", alert.message)
            }
        }

        let callback = self.callbacks.read().on_alert.clone();
        if let Some(callback) = callback {
            callback(&alert);
        }
    }

    fn resolve(&self, rule: &AlertRule) {
        let resolved = {
            let mut storage = self.storage.write();
            let resolved = storage.active.remove(&rule.id);
            if resolved.is_some() {
                storage.total_resolved += 1;
            }
            resolved
        };

        if let Some(alert) = resolved {
            info!("Alert resolved: {}", alert.message);
            let callback = self.callbacks.read().on_resolve.clone();
            if let Some(callback) = callback {
                callback(&alert);
            }
        }
    }

    // ==================== Acknowledgement ====================

    /// Acknowledge one active alert by its alert id; false if not active
    pub fn acknowledge(&self, alert_id: &str) -> bool {
        let mut storage = self.storage.write();
        for alert in storage.active.values_mut() {
            if alert.id == alert_id {
                alert.acknowledged = true;
                return true;
            }
        }
        false
    }

    /// Acknowledge every active alert; returns how many were newly flagged
    pub fn acknowledge_all(&self) -> usize {
        let mut storage = self.storage.write();
        let mut acknowledged = 0;
        for alert in storage.active.values_mut() {
            if !alert.acknowledged {
                alert.acknowledged = true;
                acknowledged += 1;
            }
        }
        acknowledged
    }

    // ==================== Projections ====================

    /// All rules, in insertion order
    pub fn get_rules(&self) -> Vec<AlertRule> {
        self.storage.read().rules.clone()
    }

    /// Currently active alerts
    pub fn get_active(&self) -> Vec<TriggeredAlert> {
        self.storage.read().active.values().cloned().collect()
    }

    /// Most recent history entries, newest first
    pub fn get_history(&self, limit: Option<usize>) -> Vec<TriggeredAlert> {
        let storage = self.storage.read();
        let limit = limit.unwrap_or(100);
        storage.history.iter().rev().take(limit).cloned().collect()
    }

    /// Engine statistics; active alerts bucketed by severity
    pub fn get_stats(&self) -> AlertStats {
        let storage = self.storage.read();
        let mut active_by_severity = std::collections::HashMap::new();
        for alert in storage.active.values() {
            *active_by_severity
                .entry(alert.severity.to_string())
                .or_insert(0) += 1;
        }

        AlertStats {
            total_fired: storage.total_fired,
            total_resolved: storage.total_resolved,
            active: storage.active.len(),
            active_by_severity,
            last_alert: storage.last_alert,
        }
    }

    // ==================== Lifecycle ====================

    /// Store `config` and (re)start the periodic evaluation task
    ///
    /// Re-initializing cancels any prior timer first: last call wins, and at
    /// most one ticker is ever live. Must be called within a tokio runtime.
    pub fn init(&self, config: AlertEngineConfig) {
        let enabled = config.enabled;
        let interval = Duration::from_millis(config.check_interval_ms.max(1));
        *self.config.write() = config;

        let mut timer = self.timer.lock();
        if let Some(handle) = timer.take() {
            debug!("Cancelling previous alert evaluation timer");
            handle.abort();
        }
        if !enabled {
            return;
        }

        info!("Starting alert evaluation every {:?}", interval);
        let engine = self.evaluator_clone();
        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; evaluation starts one
            // interval after init.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                engine.check();
            }
        }));
    }

    /// Cancel the periodic evaluation task, if any
    pub fn shutdown(&self) {
        if let Some(handle) = self.timer.lock().take() {
            info!("Stopping alert evaluation timer");
            handle.abort();
        }
    }

    /// Clone handed to the evaluation task
    ///
    /// Shares state but not the timer slot, so the task never keeps its own
    /// `JoinHandle` alive through an `Arc` cycle.
    fn evaluator_clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            source: self.source.clone(),
            storage: self.storage.clone(),
            callbacks: self.callbacks.clone(),
            timer: Arc::new(Mutex::new(None)),
        }
    }
}

impl Clone for AlertEngine {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            source: self.source.clone(),
            storage: self.storage.clone(),
            callbacks: self.callbacks.clone(),
            timer: self.timer.clone(),
        }
    }
}

impl Drop for AlertEngine {
    fn drop(&mut self) {
        // Last clone out stops the timer so it cannot outlive the engine.
        if Arc::strong_count(&self.timer) == 1 {
            if let Some(handle) = self.timer.lock().take() {
                handle.abort();
            }
        }
    }
}

impl std::fmt::Debug for AlertEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.read();
        f.debug_struct("AlertEngine")
            .field("rules", &storage.rules.len())
            .field("active", &storage.active.len())
            .finish()
    }
}

/// Exact numeric comparison; `Eq`/`Neq` honor the configured tolerance
fn compare(operator: ComparisonOperator, value: f64, threshold: f64, epsilon: f64) -> bool {
    match operator {
        ComparisonOperator::GreaterThan => value > threshold,
        ComparisonOperator::GreaterThanOrEqual => value >= threshold,
        ComparisonOperator::LessThan => value < threshold,
        ComparisonOperator::LessThanOrEqual => value <= threshold,
        ComparisonOperator::Equal => (value - threshold).abs() <= epsilon,
        ComparisonOperator::NotEqual => (value - threshold).abs() > epsilon,
    }
}
