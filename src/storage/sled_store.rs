//! Sled-backed frame store
//!
//! Three trees, written together in one multi-tree transaction:
//!
//! | tree          | key                                        | value          |
//! |---------------|--------------------------------------------|----------------|
//! | `frames`      | patient ‖ 0xFF ‖ timestamp ‖ frame id      | JSON `Frame`   |
//! | `frame_index` | frame id                                   | `frames` key   |
//! | `alerts`      | patient ‖ 0xFF ‖ created_at ‖ alert id     | JSON `Alert`   |
//!
//! Timestamps are big-endian microseconds with the sign bit flipped, so keys
//! sort chronologically within a patient prefix. 0xFF never occurs in UTF-8,
//! which keeps one patient's prefix from matching another's.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sled::transaction::{ConflictableTransactionResult, TransactionError};
use sled::Transactional;
use std::path::Path;
use uuid::Uuid;

use super::persistence::{FrameStore, PersistenceError};
use crate::types::{Alert, Frame, PatientId};

const PATIENT_SEPARATOR: u8 = 0xFF;

/// Durable frame and alert storage on an embedded sled database.
#[derive(Clone)]
pub struct SledFrameStore {
    db: sled::Db,
    frames: sled::Tree,
    frame_index: sled::Tree,
    alerts: sled::Tree,
}

impl SledFrameStore {
    /// Open or create the store at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)?;
        let store = Self {
            frames: db.open_tree("frames")?,
            frame_index: db.open_tree("frame_index")?,
            alerts: db.open_tree("alerts")?,
            db,
        };

        tracing::info!(
            path = %path_ref.display(),
            frames = store.frames.len(),
            alerts = store.alerts.len(),
            "Frame store opened"
        );
        Ok(store)
    }

    /// Number of stored frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of stored alerts.
    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }
}

fn patient_prefix(patient_id: &PatientId) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(patient_id.as_str().len() + 1);
    prefix.extend_from_slice(patient_id.as_str().as_bytes());
    prefix.push(PATIENT_SEPARATOR);
    prefix
}

fn time_key(ts: DateTime<Utc>) -> [u8; 8] {
    let mut bytes = ts.timestamp_micros().to_be_bytes();
    bytes[0] ^= 0x80;
    bytes
}

fn record_key(patient_id: &PatientId, ts: DateTime<Utc>, id: Uuid) -> Vec<u8> {
    let mut key = patient_prefix(patient_id);
    key.extend_from_slice(&time_key(ts));
    key.extend_from_slice(id.as_bytes());
    key
}

#[async_trait]
impl FrameStore for SledFrameStore {
    async fn save(&self, frame: &Frame, alert: Option<&Alert>) -> Result<Frame, PersistenceError> {
        let frame_key = record_key(&frame.patient_id, frame.timestamp, frame.id);
        let frame_value = serde_json::to_vec(frame)?;
        let alert_entry = match alert {
            Some(a) => Some((
                record_key(&a.patient_id, a.created_at, a.id),
                serde_json::to_vec(a)?,
            )),
            None => None,
        };

        (&self.frames, &self.frame_index, &self.alerts)
            .transaction(
                |(frames, index, alerts)| -> ConflictableTransactionResult<(), ()> {
                    frames.insert(frame_key.as_slice(), frame_value.as_slice())?;
                    index.insert(&frame.id.as_bytes()[..], frame_key.as_slice())?;
                    if let Some((key, value)) = &alert_entry {
                        alerts.insert(key.as_slice(), value.as_slice())?;
                    }
                    Ok(())
                },
            )
            .map_err(|e| match e {
                TransactionError::Abort(()) => {
                    PersistenceError::Storage("frame transaction aborted".to_string())
                }
                TransactionError::Storage(err) => PersistenceError::from(err),
            })?;

        // Flush is blocking disk I/O; keep it off the async workers
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.flush())
            .await
            .map_err(|e| PersistenceError::Storage(format!("flush task failed: {e}")))??;

        tracing::debug!(
            frame_id = %frame.id,
            patient = %frame.patient_id,
            with_alert = alert_entry.is_some(),
            "Stored frame"
        );
        Ok(frame.clone())
    }

    async fn get_frame(&self, id: Uuid) -> Result<Option<Frame>, PersistenceError> {
        let Some(frame_key) = self.frame_index.get(id.as_bytes())? else {
            return Ok(None);
        };

        match self.frames.get(frame_key)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            // Index without a record means the trees diverged
            None => Err(PersistenceError::NotFound),
        }
    }

    async fn list_frames(
        &self,
        patient_id: &PatientId,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Frame>, PersistenceError> {
        let mut frames = Vec::with_capacity(limit.min(64));

        for item in self.frames.scan_prefix(patient_prefix(patient_id)).rev() {
            if frames.len() >= limit {
                break;
            }

            let (_key, value) = item?;
            let frame: Frame = match serde_json::from_slice(&value) {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable stored frame");
                    continue;
                }
            };

            // Keys are chronological, so everything after this is older still
            if since.is_some_and(|s| frame.timestamp < s) {
                break;
            }
            frames.push(frame);
        }

        Ok(frames)
    }

    async fn list_alerts(&self, patient_id: &PatientId) -> Result<Vec<Alert>, PersistenceError> {
        let mut alerts = Vec::new();

        for item in self.alerts.scan_prefix(patient_prefix(patient_id)).rev() {
            let (_key, value) = item?;
            match serde_json::from_slice::<Alert>(&value) {
                Ok(alert) => alerts.push(alert),
                Err(e) => tracing::warn!(error = %e, "Skipping undecodable stored alert"),
            }
        }

        Ok(alerts)
    }

    fn backend_name(&self) -> &'static str {
        "Sled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_time_key_orders_across_epoch() {
        let before = Utc.with_ymd_and_hms(1969, 12, 31, 23, 59, 59).unwrap();
        let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert!(time_key(before) < time_key(epoch));
        assert!(time_key(epoch) < time_key(later));
    }

    #[test]
    fn test_patient_prefixes_do_not_overlap() {
        let short = patient_prefix(&PatientId::new("p1"));
        let long = patient_prefix(&PatientId::new("p10"));
        assert!(!long.starts_with(&short));
    }
}
