//! Frame records and risk classification levels

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ulcer-risk classification for a single frame.
///
/// Totally ordered: `Low < Medium < High < Critical`. Frames at `High` or
/// above are flagged for clinician review and raise an alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum RiskLevel {
    #[default]
    Low = 0,
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl RiskLevel {
    /// Whether this level requires an alert and clinician review.
    pub fn requires_alert(self) -> bool {
        self >= RiskLevel::High
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Opaque patient reference. Not validated by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(String);

impl PatientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PatientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PatientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One persisted pressure-grid reading.
///
/// Created once per successfully parsed frame and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: Uuid,
    pub patient_id: PatientId,
    /// Point in time the reading represents (UTC)
    pub timestamp: DateTime<Utc>,
    /// Original delimited payload, kept for audit and raw-data retrieval
    pub raw_csv_data: String,
    /// Noise-filtered maximum cell value
    pub peak_pressure_index: f64,
    /// Share of loaded cells, 0-100, two decimals
    pub contact_area_percent: f64,
    pub risk_level: RiskLevel,
    /// `risk_level >= High`
    pub is_flagged_for_review: bool,
}
