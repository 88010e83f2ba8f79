//! Replay loop implementation
//!
//! Replays a recording against the bus with controllable timing. The loop is
//! cooperative: it awaits a cancellable delay between events, polls a pause
//! flag at a short fixed interval, and observes a one-shot abort signal
//! scoped to exactly one run. Only one replay runs at a time; starting a new
//! one aborts the in-flight run, mirroring the recording policy.

use super::recorder::EventRecorder;
use super::types::{EventRecording, RecordedEvent, ReplayOptions, ReplayStatus, ReplaySummary};
use crate::error::{ObservabilityError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Control surface of one in-flight replay
#[derive(Clone)]
pub(super) struct ReplaySession {
    /// One-shot abort flag
    aborted: Arc<AtomicBool>,
    /// Pause flag consulted between emissions
    paused: Arc<AtomicBool>,
    /// Wakes an in-flight inter-event delay on abort
    abort_signal: Arc<Notify>,
}

impl ReplaySession {
    fn new() -> Self {
        Self {
            aborted: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            abort_signal: Arc::new(Notify::new()),
        }
    }

    pub(super) fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
        self.abort_signal.notify_waiters();
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    fn same_session(&self, other: &ReplaySession) -> bool {
        Arc::ptr_eq(&self.aborted, &other.aborted)
    }
}

impl EventRecorder {
    /// Replay a recording against the bus
    ///
    /// Filters the event list by the options' type filter and relative-time
    /// window, then walks it in order, sleeping the recorded inter-event gap
    /// divided by `speed` before each emission. Cancellation surfaces as
    /// `ReplayStatus::Cancelled` in the summary, not as an error.
    pub async fn replay(
        &self,
        recording: &EventRecording,
        options: ReplayOptions,
    ) -> Result<ReplaySummary> {
        if !(options.speed > 0.0) {
            return Err(ObservabilityError::Validation(format!(
                "replay speed must be positive, got {}",
                options.speed
            )));
        }

        let session = ReplaySession::new();
        {
            let mut current = self.session.lock();
            if let Some(previous) = current.replace(session.clone()) {
                warn!("Replay already in progress; aborting it");
                previous.abort();
            }
        }

        let events: Vec<RecordedEvent> = recording
            .events
            .iter()
            .filter(|event| {
                options
                    .start_from_ms
                    .is_none_or(|from| event.relative_ms >= from)
            })
            .filter(|event| options.stop_at_ms.is_none_or(|to| event.relative_ms <= to))
            .filter(|event| {
                options
                    .event_types
                    .as_ref()
                    .is_none_or(|types| types.contains(&event.event_type))
            })
            .cloned()
            .collect();

        info!(
            "Replaying {} of {} events from {} (speed {}, dry_run {})",
            events.len(),
            recording.events.len(),
            recording.id,
            options.speed,
            options.dry_run
        );

        let pause_poll = Duration::from_millis(self.config.pause_poll_ms.max(1));
        let mut last_relative_ms = events.first().map(|event| event.relative_ms).unwrap_or(0);
        let mut replayed = 0usize;
        let mut failed = 0usize;

        for event in &events {
            if session.is_aborted() {
                return Ok(self.finish(&session, recording, ReplayStatus::Cancelled, replayed, failed));
            }

            let gap_ms = event.relative_ms.saturating_sub(last_relative_ms);
            let delay = Duration::from_millis((gap_ms as f64 / options.speed).round() as u64);
            if !delay.is_zero() {
                tokio::select! {
                    _ = session.abort_signal.notified() => {
                        return Ok(self.finish(&session, recording, ReplayStatus::Cancelled, replayed, failed));
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            // Pausing holds before the next scheduled emission; the pending
            // event is neither rewound nor skipped.
            while session.paused.load(Ordering::Acquire) {
                if session.is_aborted() {
                    return Ok(self.finish(&session, recording, ReplayStatus::Cancelled, replayed, failed));
                }
                tokio::time::sleep(pause_poll).await;
            }
            if session.is_aborted() {
                return Ok(self.finish(&session, recording, ReplayStatus::Cancelled, replayed, failed));
            }
            last_relative_ms = event.relative_ms;

            // The veto hook skips this one event's re-emission without
            // disturbing the timing of the rest of the sequence.
            let emit = options
                .before_event
                .as_ref()
                .is_none_or(|hook| hook(event));

            if emit && !options.dry_run {
                if let Err(error) = self.bus.publish(&event.event_type, &event.payload) {
                    failed += 1;
                    match &options.on_error {
                        Some(hook) => hook(event, &error),
                        None => warn!(
                            "Replay publish failed for event {} ({}): {}",
                            event.id, event.event_type, error
                        ),
                    }
                }
            }

            replayed += 1;
            if let Some(hook) = &options.after_event {
                hook(event);
            }
        }

        Ok(self.finish(&session, recording, ReplayStatus::Completed, replayed, failed))
    }

    fn finish(
        &self,
        session: &ReplaySession,
        recording: &EventRecording,
        status: ReplayStatus,
        events_replayed: usize,
        events_failed: usize,
    ) -> ReplaySummary {
        // Clear the session slot only if it still belongs to this run; a
        // superseding replay may already have installed its own session.
        {
            let mut current = self.session.lock();
            if current
                .as_ref()
                .is_some_and(|active| active.same_session(session))
            {
                *current = None;
            }
        }

        match status {
            ReplayStatus::Completed => debug!(
                "Replay of {} completed: {} events, {} failed",
                recording.id, events_replayed, events_failed
            ),
            // User-initiated abort is a normal outcome, not a failure.
            ReplayStatus::Cancelled => info!(
                "Replay of {} cancelled after {} events",
                recording.id, events_replayed
            ),
        }

        ReplaySummary {
            recording_id: recording.id.clone(),
            status,
            events_replayed,
            events_failed,
        }
    }

    /// Hold the in-flight replay before its next emission; false when idle
    pub fn pause_replay(&self) -> bool {
        match self.session.lock().as_ref() {
            Some(session) => {
                session.paused.store(true, Ordering::Release);
                debug!("Replay paused");
                true
            }
            None => false,
        }
    }

    /// Resume a paused replay; false when idle
    pub fn resume_replay(&self) -> bool {
        match self.session.lock().as_ref() {
            Some(session) => {
                session.paused.store(false, Ordering::Release);
                debug!("Replay resumed");
                true
            }
            None => false,
        }
    }

    /// Abort the in-flight replay; false when idle
    ///
    /// The signal is one-shot and scoped to the current run: once consumed,
    /// a later replay gets a fresh session.
    pub fn abort_replay(&self) -> bool {
        match self.session.lock().take() {
            Some(session) => {
                session.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a replay is currently in flight
    pub fn is_replaying(&self) -> bool {
        self.session.lock().is_some()
    }
}
