//! Media information types.

use serde::{Deserialize, Serialize};

/// What the generation pipeline needs to know about a source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Container duration in seconds.
    pub duration_secs: f64,
    /// Whether a real video stream (not cover art) is present.
    pub has_video: bool,
}

/// Video encoder parameters for re-encoded cuts.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    /// x264 preset.
    pub preset: String,
    /// x264 constant rate factor.
    pub crf: u32,
    /// Output height; width follows the aspect ratio.
    pub height: u32,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            preset: "ultrafast".to_string(),
            crf: 28,
            height: 480,
        }
    }
}
