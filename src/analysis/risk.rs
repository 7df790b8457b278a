//! Peak pressure to risk band mapping.

use crate::config::ThresholdConfig;
use crate::types::RiskLevel;

/// Classify a peak pressure index. Bands are checked highest first and each
/// boundary is inclusive, so a peak equal to a threshold lands in the higher band.
pub fn classify_risk(peak_pressure_index: f64, thresholds: &ThresholdConfig) -> RiskLevel {
    if peak_pressure_index >= thresholds.critical {
        RiskLevel::Critical
    } else if peak_pressure_index >= thresholds.high {
        RiskLevel::High
    } else if peak_pressure_index >= thresholds.medium() {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
