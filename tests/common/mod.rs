//! Shared test infrastructure

use glasshouse::{
    AlertRule, AlertSeverity, ComparisonOperator, InMemoryBus, MetricType, ObservabilityConfig,
    ObservabilityCore, RecorderConfig,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A core wired to an in-memory bus recording the given event types
pub fn wired_core(event_types: &[&str]) -> (Arc<InMemoryBus>, ObservabilityCore) {
    let bus = Arc::new(InMemoryBus::new());
    let config = ObservabilityConfig {
        recorder: RecorderConfig {
            event_types: event_types.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        },
        ..Default::default()
    };
    let core = ObservabilityCore::new(config, bus.clone());
    (bus, core)
}

/// Counter-threshold rule firing above `threshold`
pub fn counter_rule(id: &str, metric: &str, threshold: f64) -> AlertRule {
    AlertRule {
        id: id.to_string(),
        name: format!("{} above {}", metric, threshold),
        metric: metric.to_string(),
        metric_type: MetricType::Counter,
        percentile: None,
        operator: ComparisonOperator::GreaterThan,
        threshold,
        severity: AlertSeverity::Warning,
        cooldown: Duration::ZERO,
        enabled: true,
        tag_filter: None,
    }
}

/// Subscribe a counting probe for one event type
pub fn bus_probe(bus: &InMemoryBus, event_type: &str) -> Arc<AtomicUsize> {
    use glasshouse::EventBus;

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    bus.subscribe(
        event_type,
        Arc::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );
    seen
}
