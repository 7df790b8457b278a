//! System-wide default constants.
//!
//! Centralises the tunables that `EngineConfig` falls back to when a
//! section or key is missing. Grouped by subsystem for easy discovery.

// ============================================================================
// Grid
// ============================================================================

/// Side length of the square sensor grid (cells per row and rows per frame).
pub const GRID_SIZE: usize = 32;

/// Upper bound accepted by config validation for `grid.size`.
pub const MAX_GRID_SIZE: usize = 256;

/// Field separator within a grid row.
pub const GRID_DELIMITER: char = ',';

// ============================================================================
// Analysis thresholds
// ============================================================================

/// Cells strictly above this raw value count as loaded contact area.
pub const ZERO_FORCE_VALUE: f64 = 5.0;

/// Peak pressure at or above this classifies as `High`.
pub const HIGH_THRESHOLD: f64 = 60.0;

/// Peak pressure at or above this classifies as `Critical`.
pub const CRITICAL_THRESHOLD: f64 = 75.0;

/// The `Medium` band starts at this fraction of the high threshold.
pub const MEDIUM_FRACTION_OF_HIGH: f64 = 0.75;

/// Connected regions smaller than this many cells are treated as sensor noise.
pub const MIN_PIXEL_AREA_FOR_ALERT: usize = 10;

/// Full-scale reading of the pressure mat (8-bit ADC).
pub const SENSOR_FULL_SCALE: f64 = 255.0;

// ============================================================================
// Batch ingestion
// ============================================================================

/// Synthetic spacing between consecutive frames of one upload (seconds).
///
/// The device does not embed per-frame timestamps, so frame `i` of a batch
/// is stamped `base + i * FRAME_SPACING_SECS`.
pub const FRAME_SPACING_SECS: u64 = 5;

// ============================================================================
// Server & storage
// ============================================================================

/// Default HTTP bind address.
pub const SERVER_ADDR: &str = "0.0.0.0:8080";

/// Maximum accepted request body (bytes). 8 MiB holds ~2 000 frames of 32x32.
pub const MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

/// Default sled database directory.
pub const STORAGE_PATH: &str = "./data/frames.db";

/// Frames returned by a history query when no limit is given.
pub const DEFAULT_FRAME_LIST_LIMIT: usize = 100;

/// Hard cap on frames returned by one history query.
pub const MAX_FRAME_LIST_LIMIT: usize = 500;

// ============================================================================
// Config discovery
// ============================================================================

/// Environment variable holding an explicit config file path.
pub const CONFIG_ENV_VAR: &str = "PLANTAR_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "engine_config.toml";
