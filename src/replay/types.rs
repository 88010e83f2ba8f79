//! Event recording and replay types

use crate::bus::EventPayload;
use crate::error::ObservabilityError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One bus event captured during a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Event ID
    pub id: String,
    /// Absolute capture timestamp
    pub timestamp: DateTime<Utc>,
    /// Offset from the recording start, in milliseconds
    pub relative_ms: u64,
    /// Event type the payload was published under
    pub event_type: String,
    /// Event payload
    pub payload: EventPayload,
    /// Source tag extracted from the payload, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A finalized, chronologically ordered recording session
///
/// Relative timestamps are monotonically non-decreasing within a recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecording {
    /// Recording ID
    pub id: String,
    /// Human-readable session name
    pub name: String,
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// When the session was stopped
    pub ended_at: Option<DateTime<Utc>>,
    /// Session length in milliseconds, derived at stop time
    pub duration_ms: Option<u64>,
    /// Captured events, in capture order
    pub events: Vec<RecordedEvent>,
    /// Optional host-supplied metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl EventRecording {
    /// Listing projection of this recording
    pub fn summary(&self) -> RecordingSummary {
        RecordingSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            started_at: self.started_at,
            duration_ms: self.duration_ms,
            event_count: self.events.len(),
        }
    }
}

/// Listing projection of a recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSummary {
    /// Recording ID
    pub id: String,
    /// Session name
    pub name: String,
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// Session length in milliseconds
    pub duration_ms: Option<u64>,
    /// Number of captured events
    pub event_count: usize,
}

/// Outcome of `start_recording`
#[derive(Debug, Clone)]
pub struct StartedRecording {
    /// ID of the session that just started
    pub recording_id: String,
    /// ID of a previously in-flight session that was stopped and stored
    pub superseded: Option<String>,
}

/// Hook that may veto re-emission of a single event
pub type BeforeEventHook = Arc<dyn Fn(&RecordedEvent) -> bool + Send + Sync>;

/// Hook observing each replayed event
pub type EventHook = Arc<dyn Fn(&RecordedEvent) + Send + Sync>;

/// Hook receiving per-event publish failures during replay
pub type ReplayErrorHook = Arc<dyn Fn(&RecordedEvent, &ObservabilityError) + Send + Sync>;

/// Options controlling one replay run
#[derive(Clone)]
pub struct ReplayOptions {
    /// Timing divisor; 2.0 replays twice as fast
    pub speed: f64,
    /// Execute timing and hooks without republishing to the bus
    pub dry_run: bool,
    /// When set, only these event types are replayed
    pub event_types: Option<Vec<String>>,
    /// Inclusive lower bound on relative time, in milliseconds
    pub start_from_ms: Option<u64>,
    /// Inclusive upper bound on relative time, in milliseconds
    pub stop_at_ms: Option<u64>,
    /// Pre-event hook; returning false skips that event's re-emission
    pub before_event: Option<BeforeEventHook>,
    /// Post-event hook
    pub after_event: Option<EventHook>,
    /// Per-event publish error hook
    pub on_error: Option<ReplayErrorHook>,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            dry_run: false,
            event_types: None,
            start_from_ms: None,
            stop_at_ms: None,
            before_event: None,
            after_event: None,
            on_error: None,
        }
    }
}

impl std::fmt::Debug for ReplayOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayOptions")
            .field("speed", &self.speed)
            .field("dry_run", &self.dry_run)
            .field("event_types", &self.event_types)
            .field("start_from_ms", &self.start_from_ms)
            .field("stop_at_ms", &self.stop_at_ms)
            .finish_non_exhaustive()
    }
}

/// How a replay run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayStatus {
    /// Every selected event was processed
    Completed,
    /// The run was aborted; remaining events were not emitted
    Cancelled,
}

/// Result of one replay run
///
/// Cancellation is a distinguished outcome, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    /// ID of the replayed recording
    pub recording_id: String,
    /// How the run ended
    pub status: ReplayStatus,
    /// Events processed before the run ended
    pub events_replayed: usize,
    /// Events whose re-publish failed
    pub events_failed: usize,
}
