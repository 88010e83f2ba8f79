//! Metric read capability consumed by the alert engine

use crate::metrics::Tags;

/// Read-only access to aggregated metric values
///
/// The alert engine depends on this capability instead of a concrete
/// aggregator, so rules can be evaluated against a fake source in tests.
/// Implementations must be total: unknown keys and type-mismatched reads
/// yield 0.0 rather than failing.
pub trait MetricSource: Send + Sync {
    /// Cumulative counter value for a key
    fn get_counter(&self, name: &str, tags: &Tags) -> f64;

    /// Current gauge value for a key
    fn get_gauge(&self, name: &str, tags: &Tags) -> f64;

    /// Nearest-rank percentile over a key's histogram buffer
    fn get_percentile(&self, name: &str, percentile: f64, tags: &Tags) -> f64;
}
