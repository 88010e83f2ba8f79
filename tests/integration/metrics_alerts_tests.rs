//! Aggregator-to-alert-engine integration tests

#[cfg(test)]
mod tests {
    use crate::common::{counter_rule, wired_core};
    use glasshouse::{AlertRule, MetricType, Tags, tags};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// A counter rising through its threshold fires exactly once per check
    /// while the cooldown holds, and resolves when the value falls back.
    #[test]
    fn test_counter_breach_lifecycle_end_to_end() {
        let (_bus, core) = wired_core(&[]);
        let fired = Arc::new(AtomicUsize::new(0));
        let resolved = Arc::new(AtomicUsize::new(0));

        let fire_count = fired.clone();
        core.alerts().on_alert(Arc::new(move |_| {
            fire_count.fetch_add(1, Ordering::SeqCst);
        }));
        let resolve_count = resolved.clone();
        core.alerts().on_resolve(Arc::new(move |_| {
            resolve_count.fetch_add(1, Ordering::SeqCst);
        }));

        let mut rule = counter_rule("errors-high", "errors", 10.0);
        rule.cooldown = Duration::from_secs(3600);
        core.alerts().add_rule(rule);

        core.metrics().record_counter("errors", 11.0, &Tags::new());
        core.alerts().check();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(core.alerts().get_active().len(), 1);

        // Still breached, still cooling down: no additional alert.
        core.alerts().check();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // A reset drops the counter to zero; the next pass would resolve,
        // but the rule is still inside its cooldown window.
        core.metrics().reset();
        core.alerts().check();
        assert_eq!(core.alerts().get_active().len(), 1);
        assert_eq!(resolved.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resolution_after_reset() {
        let (_bus, core) = wired_core(&[]);
        let resolved = Arc::new(AtomicUsize::new(0));

        let resolve_count = resolved.clone();
        core.alerts().on_resolve(Arc::new(move |_| {
            resolve_count.fetch_add(1, Ordering::SeqCst);
        }));

        core.alerts().add_rule(counter_rule("errors-high", "errors", 10.0));

        core.metrics().record_counter("errors", 11.0, &Tags::new());
        core.alerts().check();
        assert_eq!(core.alerts().get_active().len(), 1);

        core.metrics().reset();
        core.alerts().check();
        assert!(core.alerts().get_active().is_empty());
        assert_eq!(resolved.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_percentile_rule_reads_real_histogram() {
        let (_bus, core) = wired_core(&[]);

        for latency in [100.0, 120.0, 150.0, 180.0, 900.0] {
            core.metrics()
                .record_histogram("quote_latency", latency, &Tags::new());
        }

        let rule = AlertRule {
            metric: "quote_latency".to_string(),
            metric_type: MetricType::Histogram,
            percentile: Some(99.0),
            threshold: 500.0,
            ..counter_rule("latency-p99", "quote_latency", 500.0)
        };
        core.alerts().add_rule(rule);
        core.alerts().check();

        let active = core.alerts().get_active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].current_value, 900.0);
    }

    #[test]
    fn test_timing_rule_finds_implicitly_tagged_key() {
        let (_bus, core) = wired_core(&[]);

        core.metrics()
            .record_timing("db_query", Duration::from_millis(400), &Tags::new());

        // The rule carries no unit tag; the engine adds the implicit marker
        // the same way the recording side does.
        let rule = AlertRule {
            metric: "db_query".to_string(),
            metric_type: MetricType::Timing,
            percentile: Some(50.0),
            threshold: 100.0,
            ..counter_rule("slow-queries", "db_query", 100.0)
        };
        core.alerts().add_rule(rule);
        core.alerts().check();

        assert_eq!(core.alerts().get_active().len(), 1);
    }

    #[test]
    fn test_tag_filter_selects_one_bucket() {
        let (_bus, core) = wired_core(&[]);

        core.metrics()
            .record_counter("errors", 20.0, &tags([("tenant", "acme")]));
        core.metrics()
            .record_counter("errors", 2.0, &tags([("tenant", "globex")]));

        let mut rule = counter_rule("acme-errors", "errors", 10.0);
        rule.tag_filter = Some(tags([("tenant", "acme")]));
        core.alerts().add_rule(rule);

        let mut quiet = counter_rule("globex-errors", "errors", 10.0);
        quiet.tag_filter = Some(tags([("tenant", "globex")]));
        core.alerts().add_rule(quiet);

        core.alerts().check();

        let active = core.alerts().get_active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].rule_id, "acme-errors");
    }

    #[test]
    fn test_untyped_read_yields_zero_and_stays_quiet() {
        let (_bus, core) = wired_core(&[]);

        // Recorded as a gauge; the rule reads it as a counter.
        core.metrics().set_gauge("errors", 100.0, &Tags::new());
        core.alerts().add_rule(counter_rule("errors-high", "errors", 10.0));
        core.alerts().check();

        assert!(core.alerts().get_active().is_empty());
    }
}
