//! Alert records raised for dangerous frames

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Frame, PatientId, RiskLevel};

/// Clinician-facing lifecycle of an alert.
///
/// The engine only ever creates alerts in `New`. Every other transition
/// belongs to the clinician workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum AlertStatus {
    #[default]
    New,
    InReview,
    Resolved,
    AutoCleared,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::New => write!(f, "New"),
            AlertStatus::InReview => write!(f, "In Review"),
            AlertStatus::Resolved => write!(f, "Resolved"),
            AlertStatus::AutoCleared => write!(f, "Auto Cleared"),
        }
    }
}

/// Alert raised when a frame classifies at `High` or above.
///
/// References its frame; the frame does not reference the alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub frame_id: Uuid,
    pub patient_id: PatientId,
    /// Copied from the frame at creation, never recomputed
    pub risk_level: RiskLevel,
    pub status: AlertStatus,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    /// Owned by the clinician workflow
    #[serde(default)]
    pub clinician_notes: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Build the initiating alert for a flagged frame.
    pub fn for_frame(frame: &Frame, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            frame_id: frame.id,
            patient_id: frame.patient_id.clone(),
            risk_level: frame.risk_level,
            status: AlertStatus::New,
            reason: alert_reason(frame.peak_pressure_index),
            created_at,
            clinician_notes: None,
            resolved_at: None,
        }
    }
}

/// Human-readable alert reason, derived only from the peak value.
pub fn alert_reason(peak_pressure_index: f64) -> String {
    format!("Peak pressure index {peak_pressure_index} exceeded threshold.")
}
