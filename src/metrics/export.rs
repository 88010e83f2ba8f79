//! Prometheus-style plaintext exposition
//!
//! Renders one `# TYPE` + sample line per counter/gauge and, per
//! histogram/timing key, `_count`/`_sum` lines plus quantile lines at the
//! fixed 0.5/0.9/0.99 boundaries computed with the nearest-rank percentile.
//! The quantiles are an approximation over the bounded buffer, not a true
//! streaming histogram.

use super::aggregator::{MetricAggregator, nearest_rank};
use super::types::{MetricType, Tags};
use std::fmt::Write;

/// Quantile boundaries rendered for each histogram key
const EXPORT_QUANTILES: [f64; 3] = [50.0, 90.0, 99.0];

impl MetricAggregator {
    /// Render all metrics in the Prometheus text exposition format
    pub fn export_prometheus(&self) -> String {
        let storage = self.storage.read();

        // Deterministic output: keys sorted, TYPE line once per metric name.
        let mut keys: Vec<&String> = storage.aggregations.keys().collect();
        keys.sort();

        let mut output = String::new();
        let mut typed: std::collections::HashSet<String> = std::collections::HashSet::new();

        for key in keys {
            let Some(aggregation) = storage.aggregations.get(key) else {
                continue;
            };
            let name = sanitize_name(&aggregation.name);
            let labels = render_labels(&aggregation.tags);

            match aggregation.metric_type {
                MetricType::Counter => {
                    let value = storage.counters.get(key).copied().unwrap_or(0.0);
                    write_type_line(&mut output, &mut typed, &name, "counter");
                    let _ = writeln!(output, "{}{} {}", name, labels, value);
                }
                MetricType::Gauge => {
                    let value = storage.gauges.get(key).copied().unwrap_or(0.0);
                    write_type_line(&mut output, &mut typed, &name, "gauge");
                    let _ = writeln!(output, "{}{} {}", name, labels, value);
                }
                MetricType::Histogram | MetricType::Timing => {
                    let mut sorted: Vec<f64> = storage
                        .histograms
                        .get(key)
                        .map(|buffer| buffer.iter().copied().collect())
                        .unwrap_or_default();
                    sorted.sort_by(f64::total_cmp);

                    write_type_line(&mut output, &mut typed, &name, "summary");
                    let _ = writeln!(
                        output,
                        "{}_count{} {}",
                        name, labels, aggregation.count
                    );
                    let _ = writeln!(output, "{}_sum{} {}", name, labels, aggregation.sum);
                    for quantile in EXPORT_QUANTILES {
                        let value = nearest_rank(&sorted, quantile);
                        let labels = render_labels_with(
                            &aggregation.tags,
                            "quantile",
                            &format!("{}", quantile / 100.0),
                        );
                        let _ = writeln!(output, "{}{} {}", name, labels, value);
                    }
                }
            }
        }

        output
    }
}

fn write_type_line(
    output: &mut String,
    typed: &mut std::collections::HashSet<String>,
    name: &str,
    metric_type: &str,
) {
    if typed.insert(name.to_string()) {
        let _ = writeln!(output, "# TYPE {} {}", name, metric_type);
    }
}

/// Replace characters outside `[a-zA-Z0-9_:]` and guard a leading digit
fn sanitize_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

fn render_labels(tags: &Tags) -> String {
    if tags.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = tags
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", sanitize_name(k), escape_label_value(v)))
        .collect();
    format!("{{{}}}", rendered.join(","))
}

fn render_labels_with(tags: &Tags, extra_key: &str, extra_value: &str) -> String {
    let mut rendered: Vec<String> = tags
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", sanitize_name(k), escape_label_value(v)))
        .collect();
    rendered.push(format!("{}=\"{}\"", extra_key, extra_value));
    format!("{{{}}}", rendered.join(","))
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
