//! Settings struct with TOML-based sections.
//!
//! Each section maps to a TOML table and can be updated independently.
//! Missing keys fall back to the tuned defaults of the engine.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Where sync data and output go.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Fingerprint matching thresholds.
    #[serde(default)]
    pub matching: MatchSettings,

    /// Section extraction (cutting, encoding, scene detection).
    #[serde(default)]
    pub extraction: ExtractionSettings,
}

/// Directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Directory holding stored sync sections.
    #[serde(default = "default_current_dir")]
    pub data_dir: String,

    /// Directory synchronized subtitles are written to.
    #[serde(default = "default_current_dir")]
    pub output_dir: String,

    /// Folder for log files.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: String,
}

fn default_current_dir() -> String {
    ".".to_string()
}

fn default_logs_dir() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            data_dir: default_current_dir(),
            output_dir: default_current_dir(),
            logs_dir: default_logs_dir(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Level used when `RUST_LOG` is not set.
    #[serde(default)]
    pub level: LogLevel,

    /// Also write logs to `<logs_dir>/douki.log`.
    #[serde(default)]
    pub log_to_file: bool,
}

/// Matching thresholds. Deviations are in fingerprint offset units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSettings {
    /// A match needs more surviving samples than this.
    #[serde(default = "default_min_match_count")]
    pub min_match_count: u32,

    /// Reject matches whose spread is not below this.
    #[serde(default = "default_max_deviation")]
    pub max_deviation: f64,

    /// Stop trimming once the spread is below this.
    #[serde(default = "default_target_deviation")]
    pub target_deviation: f64,

    #[serde(default = "default_trim_factor_start")]
    pub trim_factor_start: f64,

    #[serde(default = "default_trim_factor_end")]
    pub trim_factor_end: f64,

    #[serde(default = "default_trim_factor_step")]
    pub trim_factor_step: f64,

    /// Fence width in interquartile ranges.
    #[serde(default = "default_iqr_multiplier")]
    pub iqr_multiplier: f64,
}

fn default_min_match_count() -> u32 {
    10
}

fn default_max_deviation() -> f64 {
    750.0
}

fn default_target_deviation() -> f64 {
    200.0
}

fn default_trim_factor_start() -> f64 {
    0.25
}

fn default_trim_factor_end() -> f64 {
    0.35
}

fn default_trim_factor_step() -> f64 {
    0.05
}

fn default_iqr_multiplier() -> f64 {
    1.5
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            min_match_count: default_min_match_count(),
            max_deviation: default_max_deviation(),
            target_deviation: default_target_deviation(),
            trim_factor_start: default_trim_factor_start(),
            trim_factor_end: default_trim_factor_end(),
            trim_factor_step: default_trim_factor_step(),
            iqr_multiplier: default_iqr_multiplier(),
        }
    }
}

/// Section extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSettings {
    /// Largest keyframe distance (seconds) that still allows a stream copy.
    #[serde(default = "default_max_keyframe_gap")]
    pub max_keyframe_gap_secs: f64,

    /// Keyframes are listed within this many seconds of the start.
    #[serde(default = "default_keyframe_window")]
    pub keyframe_window_secs: f64,

    #[serde(default = "default_reencode_preset")]
    pub reencode_preset: String,

    #[serde(default = "default_reencode_crf")]
    pub reencode_crf: u32,

    #[serde(default = "default_reencode_height")]
    pub reencode_height: u32,

    /// Scene score threshold for the Aegisub keyframes file.
    #[serde(default = "default_scene_threshold")]
    pub scene_threshold: f64,

    /// Decode rate for fingerprinting.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// A stored subtitle needs more events than this to be kept.
    #[serde(default = "default_min_dialogue_events")]
    pub min_dialogue_events: u32,

    #[serde(default = "default_true")]
    pub write_keyframes_file: bool,
}

fn default_max_keyframe_gap() -> f64 {
    2.0
}

fn default_keyframe_window() -> f64 {
    30.0
}

fn default_reencode_preset() -> String {
    "ultrafast".to_string()
}

fn default_reencode_crf() -> u32 {
    28
}

fn default_reencode_height() -> u32 {
    480
}

fn default_scene_threshold() -> f64 {
    0.15
}

fn default_sample_rate() -> u32 {
    22050
}

fn default_min_dialogue_events() -> u32 {
    11
}

fn default_true() -> bool {
    true
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            max_keyframe_gap_secs: default_max_keyframe_gap(),
            keyframe_window_secs: default_keyframe_window(),
            reencode_preset: default_reencode_preset(),
            reencode_crf: default_reencode_crf(),
            reencode_height: default_reencode_height(),
            scene_threshold: default_scene_threshold(),
            sample_rate: default_sample_rate(),
            min_dialogue_events: default_min_dialogue_events(),
            write_keyframes_file: true,
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Matching,
    Extraction,
}

impl ConfigSection {
    pub const ALL: [ConfigSection; 4] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Matching,
        ConfigSection::Extraction,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Matching => "matching",
            ConfigSection::Extraction => "extraction",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{MatchConfig, MAX_ALLOWED_DEVIATION, MIN_MATCH_COUNT, TRIM_FACTORS};
    use crate::keyframes::{CutConfig, MAX_KEYFRAME_GAP_SECS};

    #[test]
    fn default_settings_serializes() {
        let toml = toml::to_string_pretty(&Settings::default()).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[matching]"));
        assert!(toml.contains("data_dir"));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[paths]\ndata_dir = \"sync\"\n[logging]\nlevel = \"Debug\"";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert_eq!(parsed.paths.data_dir, "sync");
        assert_eq!(parsed.paths.logs_dir, ".logs");
        assert_eq!(parsed.logging.level, LogLevel::Debug);
        assert_eq!(parsed.extraction.reencode_crf, 28);
        assert!(parsed.extraction.write_keyframes_file);
    }

    #[test]
    fn defaults_match_engine_constants() {
        let settings = Settings::default();

        let matching = MatchConfig::from(&settings.matching);
        let engine = MatchConfig::default();
        assert_eq!(matching.min_match_count, MIN_MATCH_COUNT);
        assert_eq!(matching.max_deviation, MAX_ALLOWED_DEVIATION);
        assert_eq!(matching.trim_factors.len(), TRIM_FACTORS.len());
        for (a, b) in matching.trim_factors.iter().zip(engine.trim_factors.iter()) {
            assert!((a - b).abs() < 1e-9);
        }

        let cut = CutConfig::from(&settings.extraction);
        assert_eq!(cut.max_keyframe_gap_secs, MAX_KEYFRAME_GAP_SECS);
    }
}
