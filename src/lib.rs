//! # Glasshouse
//!
//! Embeddable observability core for event-driven services: metric
//! aggregation, threshold alerting, and event record/replay.
//!
//! ## Features
//!
//! - **Metric Aggregator**: counter/gauge/histogram/timing observations with
//!   canonical tag keys, bounded buffers, snapshots and a Prometheus-style
//!   exposition
//! - **Alert Engine**: periodic rule evaluation against an injectable metric
//!   source, edge-triggered lifecycle with per-rule cooldown
//! - **Event Recorder/Replayer**: bounded, time-ordered capture of bus events
//!   with timing-accurate replay, pause and cancellation
//! - **Embeddable**: single-process and in-memory; no network or filesystem
//!   I/O, persistence and presentation stay with the host
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use glasshouse::{InMemoryBus, ObservabilityConfig, ObservabilityCore, Tags};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus = Arc::new(InMemoryBus::new());
//!     let core = ObservabilityCore::new(ObservabilityConfig::default(), bus);
//!     core.start();
//!
//!     core.metrics().increment("quotes_served", &Tags::new());
//!     let timer = core.metrics().start_timer("quote_latency", &Tags::new());
//!     // ... serve the request ...
//!     timer.stop();
//!
//!     println!("{}", core.metrics().export_prometheus());
//!     core.shutdown();
//! }
//! ```

#![warn(clippy::all)]

// Public module exports
pub mod alerts;
pub mod bus;
pub mod config;
pub mod error;
pub mod metrics;
pub mod replay;

// Re-export main types
pub use alerts::{
    AlertEngine, AlertRule, AlertSeverity, AlertStats, ComparisonOperator, MetricSource,
    TriggeredAlert,
};
pub use bus::{EventBus, EventHandler, EventPayload, InMemoryBus, SubscriptionId};
pub use config::{
    AlertEngineConfig, MetricsConfig, ObservabilityConfig, RecorderConfig, RenotifyPolicy,
};
pub use error::{ObservabilityError, Result};
pub use metrics::{
    MetricAggregation, MetricAggregator, MetricType, MetricsSnapshot, Tags, TimerHandle, tags,
};
pub use replay::{
    EventRecorder, EventRecording, MemoryRecordingStore, RecordedEvent, RecordingStore,
    RecordingSummary, ReplayOptions, ReplayStatus, ReplaySummary, StartedRecording,
};

use std::sync::Arc;
use tracing::info;

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// The three observability components wired together from one configuration
///
/// Each instance owns its own maps and timers; nothing is process-global, so
/// independent instances (one per test, one per tenant) never interfere.
pub struct ObservabilityCore {
    config: ObservabilityConfig,
    metrics: Arc<MetricAggregator>,
    alerts: AlertEngine,
    recorder: EventRecorder,
}

impl ObservabilityCore {
    /// Create a core over the host's event bus
    pub fn new(config: ObservabilityConfig, bus: Arc<dyn EventBus>) -> Self {
        info!("Creating observability core");

        let metrics = Arc::new(MetricAggregator::new(config.metrics.clone()));
        let alerts = AlertEngine::new(
            metrics.clone() as Arc<dyn MetricSource>,
            config.alerts.clone(),
        );
        let recorder = EventRecorder::new(bus, config.recorder.clone());

        Self {
            config,
            metrics,
            alerts,
            recorder,
        }
    }

    /// The metric aggregator
    pub fn metrics(&self) -> &MetricAggregator {
        &self.metrics
    }

    /// The alert engine
    pub fn alerts(&self) -> &AlertEngine {
        &self.alerts
    }

    /// The event recorder/replayer
    pub fn recorder(&self) -> &EventRecorder {
        &self.recorder
    }

    /// Start the periodic alert evaluation timer
    pub fn start(&self) {
        info!("Starting observability core");
        self.alerts.init(self.config.alerts.clone());
    }

    /// Stop timers and in-flight sessions
    pub fn shutdown(&self) {
        info!("Stopping observability core");
        self.alerts.shutdown();
        self.recorder.abort_replay();
        let _ = self.recorder.stop_recording();
    }
}

impl std::fmt::Debug for ObservabilityCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservabilityCore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
