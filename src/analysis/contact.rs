//! Contact area: share of the sensor surface carrying load.
//!
//! Computed on the raw grid. The noise filter used for peak detection does
//! not apply here, since small clusters still press on the skin.

use super::PressureGrid;

/// Percentage of cells whose raw value exceeds `zero_force_value`,
/// rounded to two decimals. An empty grid yields 0.
pub fn calculate_contact_area_percent(grid: &PressureGrid, zero_force_value: f64) -> f64 {
    let total = grid.len();
    if total == 0 {
        return 0.0;
    }

    let contact = grid
        .cells()
        .iter()
        .filter(|&&v| f64::from(v) > zero_force_value)
        .count();

    round_to_hundredths(contact as f64 / total as f64 * 100.0)
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
