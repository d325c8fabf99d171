//! Audio fingerprinting and fingerprint matching.
//!
//! # Architecture
//!
//! 1. **Extraction** (`landmark`, `ffmpeg`): decode audio to mono 16-bit PCM
//!    and reduce it to `(offset, hash)` landmark pairs.
//!
//! 2. **Matching** (`matcher`): correlate a stored needle sequence against a
//!    freshly extracted haystack and estimate a robust delay with the time
//!    range it covers.
//!
//! Offsets are in fingerprinter frames; the source's timing factor converts
//! them to seconds.

mod ffmpeg;
mod landmark;
mod matcher;
mod types;

use std::path::Path;

pub use ffmpeg::FfmpegFingerprintSource;
pub use landmark::{LandmarkFingerprinter, DEFAULT_SAMPLE_RATE, HOP_SIZE, NFFT};
pub use matcher::{
    estimate_delays, match_needle, HaystackIndex, MatchConfig, MatchResult, MAX_ALLOWED_DEVIATION,
    MIN_MATCH_COUNT, TARGET_DEVIATION, TRIM_FACTORS,
};
pub use types::{Fingerprint, FingerprintSequence};

use crate::media::MediaError;

/// Produces fingerprint sequences for media files.
///
/// Implementations must be usable from several threads at once: the haystack
/// and the stored sections are fingerprinted in parallel.
pub trait FingerprintSource: Send + Sync {
    /// Seconds per offset unit.
    fn timing_factor(&self) -> f64;

    /// Fingerprint the audio of a media file.
    fn fingerprint_file(&self, path: &Path) -> Result<FingerprintSequence, MediaError>;
}
