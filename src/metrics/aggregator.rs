//! Metric aggregator implementation
//!
//! Ingests point observations and maintains rolling, queryable aggregates.
//! Every operation is total: unknown keys read as zero and ingestion never
//! fails. When the aggregator is disabled, writes become no-ops while reads
//! keep serving the last known state.

use super::bounded::BoundedPush;
use super::types::{MetricAggregation, MetricType, MetricsSnapshot, Tags, metric_key};
use crate::alerts::MetricSource;
use crate::config::MetricsConfig;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Consolidated metric storage - single lock for all maps
#[derive(Debug, Default)]
pub(super) struct MetricsStorage {
    /// Rolling aggregates, by metric key
    pub aggregations: HashMap<String, MetricAggregation>,
    /// Cumulative counter values, by metric key
    pub counters: HashMap<String, f64>,
    /// Current gauge values, by metric key
    pub gauges: HashMap<String, f64>,
    /// Bounded raw-value buffers, by metric key
    pub histograms: HashMap<String, VecDeque<f64>>,
    /// Bounded raw counter observations, by metric key (diagnostics)
    pub counter_log: HashMap<String, VecDeque<f64>>,
}

/// Metric aggregator for counters, gauges, histograms and timings
#[derive(Debug)]
pub struct MetricAggregator {
    /// Configuration
    config: MetricsConfig,
    /// All metric storage consolidated into a single lock
    pub(super) storage: Arc<RwLock<MetricsStorage>>,
    /// Aggregator start instant, reset together with the maps
    start_time: Arc<RwLock<Instant>>,
    /// Whether ingestion is active
    enabled: AtomicBool,
}

impl MetricAggregator {
    /// Create a new aggregator
    pub fn new(config: MetricsConfig) -> Self {
        let enabled = config.enabled;
        Self {
            config,
            storage: Arc::new(RwLock::new(MetricsStorage::default())),
            start_time: Arc::new(RwLock::new(Instant::now())),
            enabled: AtomicBool::new(enabled),
        }
    }

    /// Enable or disable ingestion; reads are unaffected
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Whether ingestion is active
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Increment a counter by 1
    pub fn increment(&self, name: &str, tags: &Tags) {
        self.record_counter(name, 1.0, tags);
    }

    /// Increment a counter by an arbitrary amount
    pub fn record_counter(&self, name: &str, amount: f64, tags: &Tags) {
        if !self.is_enabled() {
            return;
        }
        let key = metric_key(name, tags);
        let mut storage = self.storage.write();

        *storage.counters.entry(key.clone()).or_insert(0.0) += amount;
        storage
            .counter_log
            .entry(key.clone())
            .or_default()
            .push_bounded(amount, self.config.counter_log_capacity());
        Self::update_aggregation(&mut storage, &key, name, MetricType::Counter, amount, tags);
    }

    /// Overwrite the current value of a gauge
    pub fn set_gauge(&self, name: &str, value: f64, tags: &Tags) {
        if !self.is_enabled() {
            return;
        }
        let key = metric_key(name, tags);
        let mut storage = self.storage.write();

        storage.gauges.insert(key.clone(), value);
        Self::update_aggregation(&mut storage, &key, name, MetricType::Gauge, value, tags);
    }

    /// Append a raw value to a histogram buffer
    pub fn record_histogram(&self, name: &str, value: f64, tags: &Tags) {
        self.record_distribution(name, value, tags, MetricType::Histogram);
    }

    /// Record a duration as a timing observation
    ///
    /// Timings are histogram observations carrying an implicit `unit=ms` tag.
    pub fn record_timing(&self, name: &str, duration: Duration, tags: &Tags) {
        let mut tags = tags.clone();
        tags.entry("unit".to_string())
            .or_insert_with(|| "ms".to_string());
        self.record_distribution(name, duration.as_secs_f64() * 1_000.0, &tags, MetricType::Timing);
    }

    /// Start a scoped timer; the returned handle records a timing on stop
    pub fn start_timer(&self, name: &str, tags: &Tags) -> TimerHandle<'_> {
        TimerHandle {
            aggregator: self,
            name: name.to_string(),
            tags: tags.clone(),
            started: Instant::now(),
        }
    }

    fn record_distribution(&self, name: &str, value: f64, tags: &Tags, metric_type: MetricType) {
        if !self.is_enabled() {
            return;
        }
        let key = metric_key(name, tags);
        let mut storage = self.storage.write();

        storage
            .histograms
            .entry(key.clone())
            .or_default()
            .push_bounded(value, self.config.histogram_capacity);
        Self::update_aggregation(&mut storage, &key, name, metric_type, value, tags);
    }

    fn update_aggregation(
        storage: &mut MetricsStorage,
        key: &str,
        name: &str,
        metric_type: MetricType,
        value: f64,
        tags: &Tags,
    ) {
        match storage.aggregations.get_mut(key) {
            Some(aggregation) => aggregation.observe(value),
            None => {
                storage.aggregations.insert(
                    key.to_string(),
                    MetricAggregation::first(name, metric_type, value, tags),
                );
            }
        }
    }

    /// Current cumulative counter value; 0.0 for unknown keys
    pub fn get_counter(&self, name: &str, tags: &Tags) -> f64 {
        let key = metric_key(name, tags);
        self.storage.read().counters.get(&key).copied().unwrap_or(0.0)
    }

    /// Current gauge value; 0.0 for unknown keys
    pub fn get_gauge(&self, name: &str, tags: &Tags) -> f64 {
        let key = metric_key(name, tags);
        self.storage.read().gauges.get(&key).copied().unwrap_or(0.0)
    }

    /// Nearest-rank percentile over a histogram buffer
    ///
    /// Sorts the buffer ascending and indexes at `max(0, ceil(p/100 * n) - 1)`;
    /// no interpolation. Returns 0.0 for an empty or unknown buffer.
    pub fn get_percentile(&self, name: &str, percentile: f64, tags: &Tags) -> f64 {
        let key = metric_key(name, tags);
        let storage = self.storage.read();
        let Some(buffer) = storage.histograms.get(&key) else {
            return 0.0;
        };
        if buffer.is_empty() {
            return 0.0;
        }

        let mut sorted: Vec<f64> = buffer.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        nearest_rank(&sorted, percentile)
    }

    /// Aggregation for one key, if any observation has been recorded
    pub fn get_aggregation(&self, name: &str, tags: &Tags) -> Option<MetricAggregation> {
        let key = metric_key(name, tags);
        self.storage.read().aggregations.get(&key).cloned()
    }

    /// Recent raw counter observations for one key (diagnostics)
    pub fn recent_counter_observations(&self, name: &str, tags: &Tags) -> Vec<f64> {
        let key = metric_key(name, tags);
        self.storage
            .read()
            .counter_log
            .get(&key)
            .map(|log| log.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Immutable copy of the full aggregator state
    pub fn snapshot(&self) -> MetricsSnapshot {
        let storage = self.storage.read();
        MetricsSnapshot {
            captured_at: chrono::Utc::now(),
            uptime_ms: self.uptime().as_millis() as u64,
            aggregations: storage.aggregations.clone(),
            counters: storage.counters.clone(),
            gauges: storage.gauges.clone(),
            histograms: storage
                .histograms
                .iter()
                .map(|(key, buffer)| (key.clone(), buffer.iter().copied().collect()))
                .collect(),
        }
    }

    /// Elapsed time since creation or the last reset
    pub fn uptime(&self) -> Duration {
        self.start_time.read().elapsed()
    }

    /// Clear all metric state and restart the uptime clock
    pub fn reset(&self) {
        debug!("Resetting metric aggregator");
        *self.storage.write() = MetricsStorage::default();
        *self.start_time.write() = Instant::now();
    }
}

/// Nearest-rank percentile over an ascending-sorted sample
///
/// Indexes at `max(0, ceil(p/100 * n) - 1)`; no interpolation.
pub(super) fn nearest_rank(sorted: &[f64], percentile: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    let rank = ((percentile / 100.0) * n as f64).ceil() as i64 - 1;
    let index = rank.max(0) as usize;
    sorted[index.min(n - 1)]
}

impl MetricSource for MetricAggregator {
    fn get_counter(&self, name: &str, tags: &Tags) -> f64 {
        MetricAggregator::get_counter(self, name, tags)
    }

    fn get_gauge(&self, name: &str, tags: &Tags) -> f64 {
        MetricAggregator::get_gauge(self, name, tags)
    }

    fn get_percentile(&self, name: &str, percentile: f64, tags: &Tags) -> f64 {
        MetricAggregator::get_percentile(self, name, percentile, tags)
    }
}

/// Scoped timer returned by [`MetricAggregator::start_timer`]
///
/// Records the elapsed time as a timing observation when stopped.
#[must_use = "a timer that is never stopped records nothing"]
#[derive(Debug)]
pub struct TimerHandle<'a> {
    aggregator: &'a MetricAggregator,
    name: String,
    tags: Tags,
    started: Instant,
}

impl TimerHandle<'_> {
    /// Stop the timer and record the elapsed time
    pub fn stop(self) -> Duration {
        let elapsed = self.started.elapsed();
        self.aggregator.record_timing(&self.name, elapsed, &self.tags);
        elapsed
    }
}
