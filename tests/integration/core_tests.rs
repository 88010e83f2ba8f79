//! Facade lifecycle integration tests

#[cfg(test)]
mod tests {
    use crate::common::counter_rule;
    use glasshouse::{
        AlertEngineConfig, InMemoryBus, ObservabilityConfig, ObservabilityCore, Tags,
    };
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_started_core_evaluates_rules_periodically() {
        let bus = Arc::new(InMemoryBus::new());
        let config = ObservabilityConfig {
            alerts: AlertEngineConfig {
                check_interval_ms: 100,
                ..Default::default()
            },
            ..Default::default()
        };
        let core = ObservabilityCore::new(config, bus);
        let fired = Arc::new(AtomicUsize::new(0));

        let count = fired.clone();
        core.alerts().on_alert(Arc::new(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        }));

        let mut rule = counter_rule("errors-high", "errors", 10.0);
        rule.cooldown = Duration::from_secs(3600);
        core.alerts().add_rule(rule);
        core.metrics().record_counter("errors", 11.0, &Tags::new());

        core.start();
        tokio::time::sleep(Duration::from_millis(350)).await;
        core.shutdown();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(core.alerts().get_active().len(), 1);

        // The timer is gone: nothing fires after shutdown.
        core.metrics().reset();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(core.alerts().get_active().len(), 1);
    }

    #[tokio::test]
    async fn test_independent_cores_do_not_share_state() {
        let bus = Arc::new(InMemoryBus::new());
        let a = ObservabilityCore::new(ObservabilityConfig::default(), bus.clone());
        let b = ObservabilityCore::new(ObservabilityConfig::default(), bus);

        a.metrics().record_counter("requests", 5.0, &Tags::new());
        assert_eq!(a.metrics().get_counter("requests", &Tags::new()), 5.0);
        assert_eq!(b.metrics().get_counter("requests", &Tags::new()), 0.0);

        a.alerts().add_rule(counter_rule("r", "requests", 1.0));
        assert_eq!(a.alerts().get_rules().len(), 1);
        assert!(b.alerts().get_rules().is_empty());
    }

    #[test]
    fn test_snapshot_and_exposition_through_facade() {
        let bus = Arc::new(InMemoryBus::new());
        let core = ObservabilityCore::new(ObservabilityConfig::default(), bus);

        core.metrics().record_counter("requests", 3.0, &Tags::new());
        core.metrics().set_gauge("queue_depth", 7.0, &Tags::new());

        let snapshot = core.metrics().snapshot();
        assert_eq!(snapshot.counters.get("requests"), Some(&3.0));
        assert_eq!(snapshot.gauges.get("queue_depth"), Some(&7.0));

        let exposition = core.metrics().export_prometheus();
        assert!(exposition.contains("# TYPE requests counter"));
        assert!(exposition.contains("queue_depth 7"));
    }
}
