//! FrameStore trait - pluggable storage backend
//!
//! Abstracts frame and alert persistence so backends can be swapped without
//! touching the ingestion pipeline:
//! - `InMemoryFrameStore`: in-memory store for tests and minimal deployments
//! - `SledFrameStore`: embedded on-disk store (see `sled_store`)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::RwLock;
use uuid::Uuid;

use crate::types::{Alert, Frame, PatientId};

/// Trait for pluggable persistence backends
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across async tasks.
#[async_trait]
pub trait FrameStore: Send + Sync {
    /// Persist a frame together with its alert, if any.
    ///
    /// Both records are written or neither is. Returns the stored frame.
    async fn save(&self, frame: &Frame, alert: Option<&Alert>) -> Result<Frame, PersistenceError>;

    /// Fetch one frame, including its raw payload.
    async fn get_frame(&self, id: Uuid) -> Result<Option<Frame>, PersistenceError>;

    /// Frames for a patient, newest first, optionally only those at or after `since`.
    async fn list_frames(
        &self,
        patient_id: &PatientId,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Frame>, PersistenceError>;

    /// Alerts for a patient, newest first.
    async fn list_alerts(&self, patient_id: &PatientId) -> Result<Vec<Alert>, PersistenceError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("not found")]
    NotFound,
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

impl From<sled::Error> for PersistenceError {
    fn from(err: sled::Error) -> Self {
        PersistenceError::Storage(err.to_string())
    }
}

/// In-memory persistence for testing and minimal deployments
///
/// Thread-safe via `RwLock`. Not durable, data is lost on restart.
#[derive(Default)]
pub struct InMemoryFrameStore {
    frames: RwLock<Vec<Frame>>,
    alerts: RwLock<Vec<Alert>>,
}

impl InMemoryFrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored frames.
    pub fn frame_count(&self) -> usize {
        self.frames.read().map(|f| f.len()).unwrap_or(0)
    }

    /// Number of stored alerts.
    pub fn alert_count(&self) -> usize {
        self.alerts.read().map(|a| a.len()).unwrap_or(0)
    }

    /// Every stored alert, in insertion order.
    pub fn all_alerts(&self) -> Vec<Alert> {
        self.alerts.read().map(|a| a.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl FrameStore for InMemoryFrameStore {
    async fn save(&self, frame: &Frame, alert: Option<&Alert>) -> Result<Frame, PersistenceError> {
        // Take both locks before touching either so readers never observe half a write
        let mut frames = self
            .frames
            .write()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;
        let mut alerts = self
            .alerts
            .write()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        frames.push(frame.clone());
        if let Some(alert) = alert {
            alerts.push(alert.clone());
        }

        Ok(frame.clone())
    }

    async fn get_frame(&self, id: Uuid) -> Result<Option<Frame>, PersistenceError> {
        let frames = self
            .frames
            .read()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        Ok(frames.iter().find(|f| f.id == id).cloned())
    }

    async fn list_frames(
        &self,
        patient_id: &PatientId,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Frame>, PersistenceError> {
        let frames = self
            .frames
            .read()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        let mut matching: Vec<Frame> = frames
            .iter()
            .filter(|f| &f.patient_id == patient_id)
            .filter(|f| since.map_or(true, |s| f.timestamp >= s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matching.truncate(limit);

        Ok(matching)
    }

    async fn list_alerts(&self, patient_id: &PatientId) -> Result<Vec<Alert>, PersistenceError> {
        let alerts = self
            .alerts
            .read()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        let mut matching: Vec<Alert> = alerts
            .iter()
            .filter(|a| &a.patient_id == patient_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matching)
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}
