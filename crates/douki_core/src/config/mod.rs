//! Configuration management for Douki.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use douki_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new("douki.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Sync data: {}", config.settings().paths.data_dir);
//!
//! config.settings_mut().matching.max_deviation = 600.0;
//! config.update_section(ConfigSection::Matching).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult, DEFAULT_CONFIG_FILE};
pub use settings::{
    ConfigSection, ExtractionSettings, LoggingSettings, MatchSettings, PathSettings, Settings,
};
