//! Single-frame ingestion: parse, analyse, classify, then persist frame and alert together.
//!
//! ```text
//! STEP 1: Parse raw text          (MalformedGrid aborts, nothing persisted)
//! STEP 2: Peak + contact area     (noise-filtered peak, raw contact area)
//! STEP 3: Classify risk
//! STEP 4: Build Frame             (timestamp supplied or clock.now())
//! STEP 5: Build Alert             (ONLY if risk >= High)
//! STEP 6: FrameStore::save        (frame and alert in one write)
//! ```

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use crate::analysis::{analyze_frame, FrameAnalysis, MalformedGrid};
use crate::config::EngineConfig;
use crate::storage::{FrameStore, PersistenceError};
use crate::types::{Alert, Frame, PatientId};

/// Ingestion errors
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Parse(#[from] MalformedGrid),
    #[error("persistence failed: {0}")]
    Persist(#[from] PersistenceError),
    #[error("File was empty.")]
    EmptyUpload,
    #[error("Unable to detect any {size}x{size} frames in the file.")]
    NoFramesDetected { size: usize },
}

/// A fully analysed frame and the alert it raises, not yet stored.
///
/// Committed as a unit by [`FrameStore::save`].
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFrame {
    pub frame: Frame,
    pub alert: Option<Alert>,
}

/// Runs frames through analysis and into the store.
///
/// Holds no per-call state, so one instance can be shared across requests.
pub struct FrameIngestor {
    pub(super) store: Arc<dyn FrameStore>,
    pub(super) config: Arc<EngineConfig>,
    pub(super) clock: Arc<dyn Clock>,
}

impl FrameIngestor {
    /// Create an ingestor on the wall clock
    pub fn new(store: Arc<dyn FrameStore>, config: Arc<EngineConfig>) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn FrameStore>,
        config: Arc<EngineConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        info!(
            backend = store.backend_name(),
            grid = config.grid.size,
            high = config.thresholds.high,
            critical = config.thresholds.critical,
            min_area = config.thresholds.min_pixel_area_for_alert,
            "Frame ingestor ready"
        );
        Self { store, config, clock }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn FrameStore> {
        &self.store
    }

    /// Steps 1-3 only. No side effects.
    pub fn analyze(&self, raw: &str) -> Result<FrameAnalysis, MalformedGrid> {
        analyze_frame(raw, &self.config.grid, &self.config.thresholds)
    }

    /// Steps 1-5: build the frame and, for `High` and above, its alert.
    pub fn prepare(
        &self,
        patient_id: &PatientId,
        raw: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<PendingFrame, MalformedGrid> {
        let analysis = self.analyze(raw)?;

        let frame = Frame {
            id: Uuid::new_v4(),
            patient_id: patient_id.clone(),
            timestamp,
            raw_csv_data: raw.to_string(),
            peak_pressure_index: analysis.peak_pressure_index,
            contact_area_percent: analysis.contact_area_percent,
            risk_level: analysis.risk_level,
            is_flagged_for_review: analysis.is_flagged_for_review(),
        };

        let alert = frame
            .is_flagged_for_review
            .then(|| Alert::for_frame(&frame, self.clock.now()));

        Ok(PendingFrame { frame, alert })
    }

    /// Ingest one frame. A missing timestamp defaults to the current time.
    pub async fn process_frame(
        &self,
        patient_id: &PatientId,
        raw: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Frame, IngestError> {
        let timestamp = timestamp.unwrap_or_else(|| self.clock.now());
        let pending = self.prepare(patient_id, raw, timestamp)?;
        self.commit(pending).await
    }

    /// Step 6
    pub async fn commit(&self, pending: PendingFrame) -> Result<Frame, IngestError> {
        let PendingFrame { frame, alert } = pending;
        let saved = self.store.save(&frame, alert.as_ref()).await?;

        info!(
            patient = %saved.patient_id,
            frame_id = %saved.id,
            risk = %saved.risk_level,
            peak = saved.peak_pressure_index,
            contact = saved.contact_area_percent,
            alert = alert.is_some(),
            "Processed frame"
        );

        Ok(saved)
    }
}
