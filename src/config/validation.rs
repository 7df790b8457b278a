//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks on analysis thresholds.
//!
//! Raw TOML is first walked as a `toml::Value` tree and compared against the
//! known key paths; unknown keys produce warnings with a "did you mean?"
//! suggestion. Serde deserialization runs afterwards. Warnings never break
//! a config that otherwise parses.

use std::collections::HashSet;

use super::defaults::SENSOR_FULL_SCALE;
use super::EngineConfig;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `EngineConfig`.
///
/// Must be kept in step with the structs in `engine_config.rs`.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [grid]
        "grid",
        "grid.size",
        "grid.delimiter",
        // [thresholds]
        "thresholds",
        "thresholds.zero_force_value",
        "thresholds.high",
        "thresholds.critical",
        "thresholds.min_pixel_area_for_alert",
        // [batch]
        "batch",
        "batch.frame_spacing_secs",
        // [server]
        "server",
        "server.addr",
        "server.max_upload_bytes",
        // [storage]
        "storage",
        "storage.path",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// A table `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the lexicographically smaller key so suggestions are stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are reported by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Warnings
// ============================================================================

/// Flag settings that validate but are unlikely to be intended.
pub fn validate_ranges(config: &EngineConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let t = &config.thresholds;

    if t.critical > SENSOR_FULL_SCALE {
        warnings.push(ValidationWarning {
            field: "thresholds.critical".to_string(),
            message: format!(
                "critical = {:.1} is above sensor full scale ({SENSOR_FULL_SCALE:.0}); no frame can reach Critical",
                t.critical
            ),
            suggestion: None,
        });
    }

    if t.zero_force_value >= t.high {
        warnings.push(ValidationWarning {
            field: "thresholds.zero_force_value".to_string(),
            message: format!(
                "zero_force_value = {:.1} is not below high = {:.1}; contact area will ignore risky cells",
                t.zero_force_value, t.high
            ),
            suggestion: None,
        });
    }

    let cells = config.grid.size.saturating_mul(config.grid.size);
    if t.min_pixel_area_for_alert > cells {
        warnings.push(ValidationWarning {
            field: "thresholds.min_pixel_area_for_alert".to_string(),
            message: format!(
                "min_pixel_area_for_alert = {} exceeds the {cells} cells of a grid; every frame will read peak 0",
                t.min_pixel_area_for_alert
            ),
            suggestion: None,
        });
    }

    warnings
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("grid", "grid"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("critcal", "critical"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [thresholds]
            high = 60.0
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"thresholds".to_string()));
        assert!(keys.contains(&"thresholds.high".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let warnings = validate_unknown_keys(
            r#"
[thresholds]
critcal = 80.0
"#,
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "thresholds.critcal");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("thresholds.critical"));
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let warnings = validate_unknown_keys(
            r#"
[grid]
size = 32
delimiter = ","

[thresholds]
zero_force_value = 5.0
high = 60.0
critical = 75.0
min_pixel_area_for_alert = 10

[batch]
frame_spacing_secs = 5

[server]
addr = "127.0.0.1:9000"
max_upload_bytes = 1048576

[storage]
path = "/var/lib/plantar/frames.db"
"#,
        );
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn test_garbage_key_has_no_suggestion() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_defaults_produce_no_range_warnings() {
        assert!(validate_ranges(&EngineConfig::default()).is_empty());
    }

    #[test]
    fn test_oversized_noise_area_warns() {
        let mut config = EngineConfig::default();
        config.thresholds.min_pixel_area_for_alert = 2_000;
        let warnings = validate_ranges(&config);
        assert!(warnings
            .iter()
            .any(|w| w.field == "thresholds.min_pixel_area_for_alert"));
    }

    #[test]
    fn test_critical_above_full_scale_warns() {
        let mut config = EngineConfig::default();
        config.thresholds.critical = 400.0;
        let warnings = validate_ranges(&config);
        assert!(warnings.iter().any(|w| w.field == "thresholds.critical"));
    }
}
