//! ffprobe queries: container info, keyframe times and frame rate.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use super::command::run_checked;
use super::error::{MediaError, MediaResult};
use super::types::MediaInfo;

const TOOL: &str = "ffprobe";

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<FormatInfo>,
    #[serde(default)]
    streams: Vec<StreamInfo>,
}

#[derive(Debug, Deserialize)]
struct FormatInfo {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    duration: Option<String>,
    avg_frame_rate: Option<String>,
    disposition: Option<Disposition>,
}

#[derive(Debug, Deserialize)]
struct Disposition {
    #[serde(default)]
    attached_pic: u8,
}

#[derive(Debug, Deserialize)]
struct FramesOutput {
    #[serde(default)]
    frames: Vec<FrameInfo>,
}

#[derive(Debug, Deserialize)]
struct FrameInfo {
    best_effort_timestamp_time: Option<String>,
}

/// Duration and stream layout of a media file.
pub fn probe(path: &Path) -> MediaResult<MediaInfo> {
    if !path.exists() {
        return Err(MediaError::SourceNotFound(path.to_path_buf()));
    }

    let output = run_checked(
        Command::new(TOOL)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path),
        TOOL,
    )?;

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(json: &[u8]) -> MediaResult<MediaInfo> {
    let probe: ProbeOutput =
        serde_json::from_slice(json).map_err(|e| MediaError::invalid_output(TOOL, e.to_string()))?;

    let duration_secs = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| {
            probe
                .streams
                .iter()
                .filter_map(|s| s.duration.as_deref()?.parse::<f64>().ok())
                .reduce(f64::max)
        })
        .ok_or_else(|| MediaError::invalid_output(TOOL, "no duration reported"))?;

    // Cover art shows up as a video stream.
    let has_video = probe.streams.iter().any(|s| {
        s.codec_type.as_deref() == Some("video")
            && s.disposition.as_ref().map_or(true, |d| d.attached_pic == 0)
    });

    Ok(MediaInfo {
        duration_secs,
        has_video,
    })
}

/// `-read_intervals` value covering `around ± window` seconds.
pub(crate) fn keyframe_interval(around: f64, window: f64) -> String {
    let from = (around - window).floor().max(0.0);
    format!("{}%{}", from, around + window)
}

/// Decode keyframe times within `window` seconds of `around`.
pub fn list_keyframes(path: &Path, around: f64, window: f64) -> MediaResult<Vec<f64>> {
    let output = run_checked(
        Command::new(TOOL)
            .args(["-v", "quiet", "-skip_frame", "nokey", "-select_streams", "v"])
            .args(["-show_frames", "-show_entries", "frame=best_effort_timestamp_time"])
            .args(["-read_intervals", &keyframe_interval(around, window)])
            .args(["-of", "json"])
            .arg(path),
        TOOL,
    )?;

    let keyframes = parse_keyframes(&output.stdout)?;
    tracing::debug!(
        "Found {} keyframes around {:.3}s in {}",
        keyframes.len(),
        around,
        path.display()
    );
    Ok(keyframes)
}

fn parse_keyframes(json: &[u8]) -> MediaResult<Vec<f64>> {
    let frames: FramesOutput =
        serde_json::from_slice(json).map_err(|e| MediaError::invalid_output(TOOL, e.to_string()))?;

    Ok(frames
        .frames
        .iter()
        .filter_map(|f| f.best_effort_timestamp_time.as_deref()?.parse::<f64>().ok())
        .filter(|t| t.is_finite())
        .collect())
}

/// Average frame rate of the first video stream.
pub fn frame_rate(path: &Path) -> MediaResult<f64> {
    let output = run_checked(
        Command::new(TOOL)
            .args(["-v", "quiet", "-select_streams", "v"])
            .args(["-show_entries", "stream=avg_frame_rate", "-of", "json"])
            .arg(path),
        TOOL,
    )?;

    parse_frame_rate_output(&output.stdout)
}

fn parse_frame_rate_output(json: &[u8]) -> MediaResult<f64> {
    let probe: ProbeOutput =
        serde_json::from_slice(json).map_err(|e| MediaError::invalid_output(TOOL, e.to_string()))?;

    probe
        .streams
        .iter()
        .filter_map(|s| s.avg_frame_rate.as_deref())
        .find_map(parse_rate)
        .ok_or_else(|| MediaError::invalid_output(TOOL, "no usable frame rate"))
}

/// Parse `"24000/1001"` or `"25"`.
fn parse_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_reads_duration_and_video() {
        let json = br#"{
            "streams": [
                {"codec_type": "video", "avg_frame_rate": "24000/1001"},
                {"codec_type": "audio"}
            ],
            "format": {"duration": "1420.512000"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert!(info.has_video);
        assert!((info.duration_secs - 1420.512).abs() < 1e-9);
    }

    #[test]
    fn cover_art_is_not_video() {
        let json = br#"{
            "streams": [
                {"codec_type": "audio", "duration": "61.0"},
                {"codec_type": "video", "disposition": {"attached_pic": 1}}
            ],
            "format": {}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert!(!info.has_video);
        assert_eq!(info.duration_secs, 61.0);
    }

    #[test]
    fn probe_without_duration_fails() {
        let json = br#"{"streams": [], "format": {}}"#;
        assert!(matches!(
            parse_probe_output(json),
            Err(MediaError::InvalidOutput { .. })
        ));
        assert!(parse_probe_output(b"not json").is_err());
    }

    #[test]
    fn keyframes_skip_missing_times() {
        let json = br#"{"frames": [
            {"best_effort_timestamp_time": "0.000000"},
            {"best_effort_timestamp_time": "N/A"},
            {},
            {"best_effort_timestamp_time": "10.427083"}
        ]}"#;
        assert_eq!(parse_keyframes(json).unwrap(), vec![0.0, 10.427083]);
        assert!(parse_keyframes(b"{}").unwrap().is_empty());
    }

    #[test]
    fn keyframe_window_is_clamped() {
        assert_eq!(keyframe_interval(10.0, 30.0), "0%40");
        assert_eq!(keyframe_interval(95.5, 30.0), "65%125.5");
    }

    #[test]
    fn frame_rates() {
        assert!((parse_rate("24000/1001").unwrap() - 23.976).abs() < 1e-3);
        assert_eq!(parse_rate("25"), Some(25.0));
        assert_eq!(parse_rate("0/0"), None);
        let json = br#"{"streams": [{"avg_frame_rate": "0/0"}, {"avg_frame_rate": "30/1"}]}"#;
        assert_eq!(parse_frame_rate_output(json).unwrap(), 30.0);
    }
}
