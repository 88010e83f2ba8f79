//! Persistence contract for recordings
//!
//! The core performs no filesystem or network I/O; durable storage is an
//! external collaborator implementing this contract. `MemoryRecordingStore`
//! is the in-process reference implementation used by hosts and tests.

use super::types::{EventRecording, RecordingSummary};
use crate::error::{ObservabilityError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// External persistence collaborator for recordings
#[async_trait]
pub trait RecordingStore: Send + Sync {
    /// Persist a recording, returning its id
    async fn save(&self, recording: &EventRecording) -> Result<String>;

    /// Load a recording by id
    async fn load(&self, id: &str) -> Result<EventRecording>;

    /// Summaries of stored recordings, optionally filtered by name substring
    async fn list(&self, name_filter: Option<&str>) -> Result<Vec<RecordingSummary>>;

    /// Delete a recording by id
    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory recording store
#[derive(Debug, Default)]
pub struct MemoryRecordingStore {
    recordings: RwLock<HashMap<String, EventRecording>>,
}

impl MemoryRecordingStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordingStore for MemoryRecordingStore {
    async fn save(&self, recording: &EventRecording) -> Result<String> {
        self.recordings
            .write()
            .insert(recording.id.clone(), recording.clone());
        Ok(recording.id.clone())
    }

    async fn load(&self, id: &str) -> Result<EventRecording> {
        self.recordings
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ObservabilityError::NotFound(format!("recording {}", id)))
    }

    async fn list(&self, name_filter: Option<&str>) -> Result<Vec<RecordingSummary>> {
        let recordings = self.recordings.read();
        let mut summaries: Vec<RecordingSummary> = recordings
            .values()
            .filter(|recording| name_filter.is_none_or(|needle| recording.name.contains(needle)))
            .map(EventRecording::summary)
            .collect();
        summaries.sort_by_key(|summary| summary.started_at);
        Ok(summaries)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.recordings.write().remove(id) {
            Some(_) => Ok(()),
            None => Err(ObservabilityError::NotFound(format!("recording {}", id))),
        }
    }
}
