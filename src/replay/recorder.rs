//! Event recorder implementation
//!
//! Captures a bounded, time-ordered session of bus events. The recorder
//! subscribes to an explicit allow-list of event types; the bus has no
//! wildcard primitive. At most one session records at a time: starting a new
//! one stops and stores the previous session (last call wins, surfaced to
//! the caller).

use super::replayer::ReplaySession;
use super::types::{EventRecording, RecordedEvent, RecordingSummary, StartedRecording};
use crate::bus::{EventBus, EventHandler, EventPayload, SubscriptionId};
use crate::config::RecorderConfig;
use crate::error::{ObservabilityError, Result};
use crate::metrics::BoundedPush;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A session currently capturing events
pub(super) struct ActiveRecording {
    /// Recording ID
    pub id: String,
    /// Session name
    pub name: String,
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Monotonic start, source of relative timestamps
    pub started_instant: Instant,
    /// Captured events, oldest evicted at capacity
    pub events: VecDeque<RecordedEvent>,
    /// Live bus subscriptions to drop at stop time
    pub subscriptions: Vec<SubscriptionId>,
}

/// Consolidated recorder state - single lock for session and stored recordings
#[derive(Default)]
pub(super) struct RecorderState {
    /// In-flight session, if any
    pub current: Option<ActiveRecording>,
    /// Finalized recordings, by id
    pub recordings: HashMap<String, EventRecording>,
}

/// Event recorder and replayer over an external publish/subscribe bus
pub struct EventRecorder {
    /// Configuration
    pub(super) config: RecorderConfig,
    /// Host event bus
    pub(super) bus: Arc<dyn EventBus>,
    /// Recorder state
    pub(super) state: Arc<RwLock<RecorderState>>,
    /// In-flight replay session, if any
    pub(super) session: Arc<Mutex<Option<ReplaySession>>>,
}

impl EventRecorder {
    /// Create a recorder over `bus`
    pub fn new(bus: Arc<dyn EventBus>, config: RecorderConfig) -> Self {
        Self {
            config,
            bus,
            state: Arc::new(RwLock::new(RecorderState::default())),
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether a session is currently capturing events
    pub fn is_recording(&self) -> bool {
        self.state.read().current.is_some()
    }

    /// Start a recording session, superseding any in-flight one
    ///
    /// A superseded session is stopped and stored first; its id is returned
    /// so the policy is visible to the caller rather than silent.
    pub fn start_recording(&self, name: Option<&str>) -> StartedRecording {
        let superseded = self.stop_recording().map(|recording| recording.id);
        if let Some(previous) = &superseded {
            warn!("Recording already in progress; superseded session {}", previous);
        }

        let id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("recording-{}", started_at.format("%Y%m%dT%H%M%S")));

        self.state.write().current = Some(ActiveRecording {
            id: id.clone(),
            name,
            started_at,
            started_instant: Instant::now(),
            events: VecDeque::new(),
            subscriptions: Vec::new(),
        });

        // Subscribe after the session is visible so handlers always find it.
        let subscriptions: Vec<SubscriptionId> = self
            .config
            .event_types
            .iter()
            .map(|event_type| self.bus.subscribe(event_type, self.capture_handler()))
            .collect();
        debug!(
            "Recording {} listening on {} event types",
            id,
            subscriptions.len()
        );

        if let Some(active) = self.state.write().current.as_mut() {
            active.subscriptions = subscriptions;
        }

        info!("Started recording session {}", id);
        StartedRecording {
            recording_id: id,
            superseded,
        }
    }

    /// Handler appending each observed event to the in-flight session
    fn capture_handler(&self) -> EventHandler {
        let state = self.state.clone();
        let max_events = self.config.max_events;

        Arc::new(move |event_type: &str, payload: &EventPayload| {
            let mut state = state.write();
            let Some(active) = state.current.as_mut() else {
                return;
            };

            let relative_ms = active.started_instant.elapsed().as_millis() as u64;
            let source = payload
                .get("source")
                .and_then(|value| value.as_str())
                .map(str::to_string);

            active.events.push_bounded(
                RecordedEvent {
                    id: Uuid::new_v4().to_string(),
                    timestamp: Utc::now(),
                    relative_ms,
                    event_type: event_type.to_string(),
                    payload: payload.clone(),
                    source,
                },
                max_events,
            );
        })
    }

    /// Stop the in-flight session and store it; `None` when idle
    pub fn stop_recording(&self) -> Option<EventRecording> {
        let active = self.state.write().current.take()?;

        for subscription in &active.subscriptions {
            self.bus.unsubscribe(*subscription);
        }

        let recording = EventRecording {
            id: active.id,
            name: active.name,
            started_at: active.started_at,
            ended_at: Some(Utc::now()),
            duration_ms: Some(active.started_instant.elapsed().as_millis() as u64),
            events: active.events.into_iter().collect(),
            metadata: None,
        };

        info!(
            "Stopped recording {} with {} events",
            recording.id,
            recording.events.len()
        );
        self.state
            .write()
            .recordings
            .insert(recording.id.clone(), recording.clone());
        Some(recording)
    }

    // ==================== Recording Management ====================

    /// Fetch one stored recording
    pub fn get_recording(&self, id: &str) -> Option<EventRecording> {
        self.state.read().recordings.get(id).cloned()
    }

    /// Summaries of all stored recordings, oldest first
    pub fn list_recordings(&self) -> Vec<RecordingSummary> {
        let state = self.state.read();
        let mut summaries: Vec<RecordingSummary> = state
            .recordings
            .values()
            .map(EventRecording::summary)
            .collect();
        summaries.sort_by_key(|summary| summary.started_at);
        summaries
    }

    /// Delete one stored recording; false for unknown ids
    pub fn delete_recording(&self, id: &str) -> bool {
        self.state.write().recordings.remove(id).is_some()
    }

    /// Delete all stored recordings, returning how many were removed
    pub fn clear_recordings(&self) -> usize {
        let mut state = self.state.write();
        let removed = state.recordings.len();
        state.recordings.clear();
        removed
    }

    // ==================== Export / Import ====================

    /// Serialize a stored recording to a transportable JSON document
    pub fn export_recording(&self, id: &str) -> Result<String> {
        let recording = self
            .get_recording(id)
            .ok_or_else(|| ObservabilityError::NotFound(format!("recording {}", id)))?;
        Ok(serde_json::to_string_pretty(&recording)?)
    }

    /// Parse, validate and store a serialized recording; returns its id
    ///
    /// Fails fast on malformed JSON and on violated invariants instead of
    /// constructing a corrupt recording.
    pub fn import_recording(&self, serialized: &str) -> Result<String> {
        let recording: EventRecording = serde_json::from_str(serialized)?;
        validate_recording(&recording)?;

        info!(
            "Imported recording {} with {} events",
            recording.id,
            recording.events.len()
        );
        let id = recording.id.clone();
        self.state.write().recordings.insert(id.clone(), recording);
        Ok(id)
    }
}

impl std::fmt::Debug for EventRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("EventRecorder")
            .field("recording", &state.current.is_some())
            .field("stored", &state.recordings.len())
            .finish()
    }
}

/// Structural checks on an imported recording
fn validate_recording(recording: &EventRecording) -> Result<()> {
    if recording.id.is_empty() {
        return Err(ObservabilityError::Validation(
            "recording id must not be empty".to_string(),
        ));
    }
    for pair in recording.events.windows(2) {
        if pair[1].relative_ms < pair[0].relative_ms {
            return Err(ObservabilityError::Validation(format!(
                "relative timestamps must be non-decreasing (event {} precedes {})",
                pair[1].id, pair[0].id
            )));
        }
    }
    Ok(())
}
