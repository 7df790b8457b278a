//! Engine Configuration Module
//!
//! Loads grid shape, analysis thresholds, and service settings from TOML,
//! replacing compiled constants with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `PLANTAR_CONFIG` environment variable (path to TOML file)
//! 2. `engine_config.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])
//!
//! ## Usage
//!
//! The config is injected, not global: load it once at startup and hand an
//! `Arc<EngineConfig>` to the ingestor.
//!
//! ```ignore
//! let config = Arc::new(EngineConfig::load());
//! let ingestor = FrameIngestor::new(store, Arc::clone(&config));
//! ```

mod engine_config;
pub mod defaults;
pub mod validation;

pub use engine_config::*;
