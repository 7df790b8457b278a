//! Batch upload summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall outcome of a multi-frame upload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BatchStatus {
    Failed,
    Completed,
    CompletedWithErrors,
}

impl BatchStatus {
    /// Derive the status from success and failure counts.
    pub fn from_counts(processed: usize, failed: usize) -> Self {
        match (processed, failed) {
            (0, _) => BatchStatus::Failed,
            (_, 0) => BatchStatus::Completed,
            _ => BatchStatus::CompletedWithErrors,
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchStatus::Failed => write!(f, "Failed"),
            BatchStatus::Completed => write!(f, "Completed"),
            BatchStatus::CompletedWithErrors => write!(f, "CompletedWithErrors"),
        }
    }
}

/// Ephemeral per-call summary of a batch upload. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchUploadResult {
    pub file_name: String,
    pub frames_detected: usize,
    pub frames_processed: usize,
    pub alerts_raised: usize,
    pub status: BatchStatus,
    pub uploaded_at: DateTime<Utc>,
    /// Base timestamp applied to frame 1; later frames are spaced from it
    pub base_timestamp: DateTime<Utc>,
    /// Ids of persisted frames, in upload order
    pub frame_ids: Vec<Uuid>,
    /// One entry per failed frame, tagged with its 1-based index
    pub errors: Vec<String>,
    /// Set when the caller cancelled the batch between frames
    #[serde(default)]
    pub cancelled: bool,
}
