//! Fingerprints decoded by ffmpeg.
//!
//! Audio is decoded to mono signed 16-bit PCM and streamed straight into the
//! fingerprinter, so whole episodes never sit in memory as samples.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};

use super::landmark::{LandmarkFingerprinter, DEFAULT_SAMPLE_RATE, HOP_SIZE};
use super::types::FingerprintSequence;
use super::FingerprintSource;
use crate::config::ExtractionSettings;
use crate::media::MediaError;

const TOOL: &str = "ffmpeg";
const READ_CHUNK: usize = 64 * 1024;

/// [`FingerprintSource`] decoding audio with the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegFingerprintSource {
    sample_rate: u32,
}

impl FfmpegFingerprintSource {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl Default for FfmpegFingerprintSource {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl From<&ExtractionSettings> for FfmpegFingerprintSource {
    fn from(settings: &ExtractionSettings) -> Self {
        Self::new(settings.sample_rate)
    }
}

impl FingerprintSource for FfmpegFingerprintSource {
    fn timing_factor(&self) -> f64 {
        HOP_SIZE as f64 / self.sample_rate as f64
    }

    fn fingerprint_file(&self, path: &Path) -> Result<FingerprintSequence, MediaError> {
        if !path.exists() {
            return Err(MediaError::SourceNotFound(path.to_path_buf()));
        }

        let mut cmd = Command::new(TOOL);
        cmd.arg("-nostdin")
            .arg("-i")
            .arg(path)
            .args(["-vn", "-acodec", "pcm_s16le", "-ac", "1", "-ar"])
            .arg(self.sample_rate.to_string())
            .args(["-f", "s16le", "-v", "fatal", "pipe:1"]);
        cmd.stdin(Stdio::null())
            .stderr(Stdio::null())
            .stdout(Stdio::piped());

        tracing::debug!("Running FFmpeg: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| MediaError::spawn(TOOL, e))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::invalid_output(TOOL, "failed to capture stdout"))?;

        let mut fingerprinter = LandmarkFingerprinter::with_sample_rate(self.sample_rate);
        let mut fingerprints = FingerprintSequence::new();
        let mut buffer = vec![0u8; READ_CHUNK];
        loop {
            match stdout.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => fingerprints.extend(fingerprinter.process_bytes(&buffer[..read])),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    child.kill().ok();
                    child.wait().ok();
                    return Err(e.into());
                }
            }
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(MediaError::command_failed(
                TOOL,
                status.code(),
                format!("audio decode of {} failed", path.display()),
            ));
        }

        tracing::debug!(
            "Extracted {} fingerprints from {}",
            fingerprints.len(),
            path.display()
        );
        Ok(fingerprints)
    }
}
