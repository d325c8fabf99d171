//! ffmpeg/ffprobe collaborators.
//!
//! The pipelines only talk to media through [`MediaBackend`], so tests can
//! substitute a fake and run without any external tools installed.

mod command;
mod error;
mod ffmpeg;
mod ffprobe;
mod types;

use std::path::Path;

pub use error::{MediaError, MediaResult};
pub use types::{EncodeSettings, MediaInfo};

use crate::config::ExtractionSettings;
use crate::keyframes::KEYFRAME_WINDOW_SECS;

/// Media operations needed to build sync data.
pub trait MediaBackend: Send + Sync {
    /// Duration and stream layout of `path`.
    fn probe(&self, path: &Path) -> MediaResult<MediaInfo>;

    /// Decode keyframe times near `around` seconds, in stream order.
    fn list_keyframes(&self, path: &Path, around: f64) -> MediaResult<Vec<f64>>;

    /// Cut `[start, end]` of `source` into `output`, re-encoding video when asked.
    fn cut(&self, source: &Path, start: f64, end: f64, reencode: bool, output: &Path) -> MediaResult<()>;

    /// Write the first subtitle track of `input` to `output`, restricted to
    /// `window` when given. `Ok(false)` means there was nothing to extract.
    fn extract_subtitle(&self, input: &Path, window: Option<(f64, f64)>, output: &Path) -> MediaResult<bool>;

    /// Dump embedded attachments of `media` into the existing directory `dir`.
    fn dump_attachments(&self, media: &Path, dir: &Path) -> MediaResult<()>;

    /// Average video frame rate.
    fn frame_rate(&self, path: &Path) -> MediaResult<f64>;

    /// Times (seconds) of detected scene changes.
    fn scene_changes(&self, path: &Path, threshold: f64) -> MediaResult<Vec<f64>>;
}

/// [`MediaBackend`] running the `ffmpeg` and `ffprobe` binaries from `PATH`.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    encode: EncodeSettings,
    keyframe_window_secs: f64,
}

impl FfmpegBackend {
    pub fn new(encode: EncodeSettings, keyframe_window_secs: f64) -> Self {
        Self {
            encode,
            keyframe_window_secs,
        }
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new(EncodeSettings::default(), KEYFRAME_WINDOW_SECS)
    }
}

impl From<&ExtractionSettings> for FfmpegBackend {
    fn from(settings: &ExtractionSettings) -> Self {
        Self::new(
            EncodeSettings {
                preset: settings.reencode_preset.clone(),
                crf: settings.reencode_crf,
                height: settings.reencode_height,
            },
            settings.keyframe_window_secs,
        )
    }
}

impl MediaBackend for FfmpegBackend {
    fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        ffprobe::probe(path)
    }

    fn list_keyframes(&self, path: &Path, around: f64) -> MediaResult<Vec<f64>> {
        ffprobe::list_keyframes(path, around, self.keyframe_window_secs)
    }

    fn cut(&self, source: &Path, start: f64, end: f64, reencode: bool, output: &Path) -> MediaResult<()> {
        ffmpeg::cut(source, start, end, reencode, &self.encode, output)
    }

    fn extract_subtitle(&self, input: &Path, window: Option<(f64, f64)>, output: &Path) -> MediaResult<bool> {
        ffmpeg::extract_subtitle(input, window, output)
    }

    fn dump_attachments(&self, media: &Path, dir: &Path) -> MediaResult<()> {
        ffmpeg::dump_attachments(media, dir)
    }

    fn frame_rate(&self, path: &Path) -> MediaResult<f64> {
        ffprobe::frame_rate(path)
    }

    fn scene_changes(&self, path: &Path, threshold: f64) -> MediaResult<Vec<f64>> {
        ffmpeg::scene_changes(path, threshold)
    }
}
