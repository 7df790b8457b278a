//! Frame Analysis Module
//!
//! Deterministic, side-effect free calculations over one pressure frame.
//! Same text and thresholds in, same metrics out.
//!
//! ## Stages
//! - `parse_grid()` - delimited text to an N x N integer grid
//! - `summarize_peak()` - connected-component flood fill with noise rejection
//! - `calculate_contact_area_percent()` - loaded share of the raw grid
//! - `classify_risk()` - peak pressure to `RiskLevel`

pub mod contact;
pub mod grid;
pub mod peak;
pub mod risk;

pub use contact::calculate_contact_area_percent;
pub use grid::{parse_grid, MalformedGrid, PressureGrid};
pub use peak::{calculate_peak_pressure, find_components, summarize_peak, Component, PeakSummary};
pub use risk::classify_risk;

use serde::{Deserialize, Serialize};

use crate::config::{GridConfig, ThresholdConfig};
use crate::types::RiskLevel;

/// Metrics derived from one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    pub peak_pressure_index: f64,
    pub contact_area_percent: f64,
    pub risk_level: RiskLevel,
    /// Components that survived the noise filter
    pub components_kept: usize,
    /// Components discarded as noise
    pub components_discarded: usize,
}

impl FrameAnalysis {
    pub fn is_flagged_for_review(&self) -> bool {
        self.risk_level.requires_alert()
    }
}

/// Compute all metrics for an already-parsed grid.
pub fn analyze_grid(grid: &PressureGrid, thresholds: &ThresholdConfig) -> FrameAnalysis {
    let summary = summarize_peak(grid, thresholds.min_pixel_area_for_alert);
    let peak_pressure_index = f64::from(summary.peak);

    FrameAnalysis {
        peak_pressure_index,
        contact_area_percent: calculate_contact_area_percent(grid, thresholds.zero_force_value),
        risk_level: classify_risk(peak_pressure_index, thresholds),
        components_kept: summary.kept.len(),
        components_discarded: summary.discarded,
    }
}

/// Parse raw frame text and compute its metrics.
pub fn analyze_frame(
    raw: &str,
    grid: &GridConfig,
    thresholds: &ThresholdConfig,
) -> Result<FrameAnalysis, MalformedGrid> {
    let parsed = parse_grid(raw, grid.size, grid.delimiter)?;
    let analysis = analyze_grid(&parsed, thresholds);

    tracing::debug!(
        peak = analysis.peak_pressure_index,
        raw_max = parsed.raw_max(),
        kept = analysis.components_kept,
        discarded = analysis.components_discarded,
        contact = analysis.contact_area_percent,
        "Frame analysed"
    );

    Ok(analysis)
}
