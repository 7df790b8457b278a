//! Engine Configuration - analysis thresholds and service settings as TOML values
//!
//! Every tunable the analysis engine reads lives in this module. Each struct
//! implements `Default` with the values from `defaults`, so an absent or
//! partial config file behaves exactly like the built-in constants.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for an engine deployment.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$PLANTAR_CONFIG` env var
/// 2. `./engine_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sensor grid shape and text format
    #[serde(default)]
    pub grid: GridConfig,

    /// Noise filter and risk classification thresholds
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Multi-frame upload handling
    #[serde(default)]
    pub batch: BatchConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Persistent store location
    #[serde(default)]
    pub storage: StorageConfig,
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$PLANTAR_CONFIG` environment variable
    /// 2. `./engine_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded engine config from PLANTAR_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from PLANTAR_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "PLANTAR_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded engine config from ./engine_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./engine_config.toml, using defaults");
                }
            }
        }

        info!("No engine_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are reported as warnings and never fail the parse.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;

        for w in super::validation::validate_ranges(&config) {
            warn!("{}", w);
        }
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate every setting for internal consistency.
    ///
    /// Rules:
    /// - Grid size within 1..=MAX_GRID_SIZE
    /// - Thresholds finite, high > 0, critical >= high, zero-force >= 0
    /// - Noise area and frame spacing at least 1
    /// - Delimiter cannot appear inside an integer field
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();
        let t = &self.thresholds;

        if self.grid.size == 0 || self.grid.size > defaults::MAX_GRID_SIZE {
            errors.push(format!(
                "grid.size = {} must be within 1-{}",
                self.grid.size,
                defaults::MAX_GRID_SIZE
            ));
        }

        let d = self.grid.delimiter;
        if d.is_ascii_digit() || d == '-' || d == '+' || d.is_whitespace() {
            errors.push(format!(
                "grid.delimiter = {d:?} would split inside integer fields"
            ));
        }

        Self::check_escalation(t.high, t.critical, "thresholds", &mut errors);
        if t.high.is_finite() && t.high <= 0.0 {
            errors.push(format!("thresholds.high ({:.3}) must be > 0", t.high));
        }

        if !t.zero_force_value.is_finite() || t.zero_force_value < 0.0 {
            errors.push(format!(
                "thresholds.zero_force_value ({}) must be finite and >= 0",
                t.zero_force_value
            ));
        }

        if t.min_pixel_area_for_alert == 0 {
            errors.push("thresholds.min_pixel_area_for_alert must be >= 1".to_string());
        }

        if self.batch.frame_spacing_secs == 0 {
            errors.push("batch.frame_spacing_secs must be >= 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_escalation(high: f64, critical: f64, name: &str, errors: &mut Vec<String>) {
        // NaN/Inf comparisons silently pass, catch them explicitly
        if !high.is_finite() || !critical.is_finite() {
            errors.push(format!(
                "{name}: values must be finite (got high={high}, critical={critical})"
            ));
            return;
        }
        if critical < high {
            errors.push(format!(
                "{name}: critical ({critical:.3}) must be >= high ({high:.3})"
            ));
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Sensor grid shape and text format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Side length N of the N x N grid
    pub size: usize,
    /// Field separator within a row
    pub delimiter: char,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: defaults::GRID_SIZE,
            delimiter: defaults::GRID_DELIMITER,
        }
    }
}

/// Noise filtering and risk banding thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Cells strictly above this count as contact area
    pub zero_force_value: f64,
    /// Peak at or above this is `High`
    pub high: f64,
    /// Peak at or above this is `Critical`
    pub critical: f64,
    /// Components with fewer cells are discarded as noise
    pub min_pixel_area_for_alert: usize,
}

impl ThresholdConfig {
    /// Lower bound of the `Medium` band, derived from the high threshold.
    pub fn medium(&self) -> f64 {
        self.high * defaults::MEDIUM_FRACTION_OF_HIGH
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            zero_force_value: defaults::ZERO_FORCE_VALUE,
            high: defaults::HIGH_THRESHOLD,
            critical: defaults::CRITICAL_THRESHOLD,
            min_pixel_area_for_alert: defaults::MIN_PIXEL_AREA_FOR_ALERT,
        }
    }
}

/// Multi-frame upload handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Seconds between consecutive frames of one upload
    pub frame_spacing_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            frame_spacing_secs: defaults::FRAME_SPACING_SECS,
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: defaults::SERVER_ADDR.to_string(),
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
        }
    }
}

/// Persistent store location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(defaults::STORAGE_PATH),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Tests
// ============================================================================
