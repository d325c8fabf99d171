//! ffmpeg operations: section cuts, subtitle extraction, attachments and
//! scene detection.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use regex::Regex;

use super::command::{run_checked, run_unchecked};
use super::error::{MediaError, MediaResult};
use super::types::EncodeSettings;

const TOOL: &str = "ffmpeg";

fn seconds(value: f64) -> String {
    format!("{:.5}", value)
}

/// Arguments cutting `source` to `[start, end]` into `output`.
///
/// A re-encode converts video with x264 and copies audio; otherwise every
/// stream is copied.
pub(crate) fn cut_args(
    source: &Path,
    start: f64,
    end: f64,
    reencode: bool,
    encode: &EncodeSettings,
    output: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-nostdin", "-y", "-ss"].map(OsString::from).to_vec();
    args.push(seconds(start).into());
    args.push("-to".into());
    args.push(seconds(end).into());
    args.push("-i".into());
    args.push(source.into());
    args.extend(["-map", "0", "-avoid_negative_ts", "make_zero"].map(OsString::from));

    if reencode {
        args.extend(["-codec:a", "copy", "-codec:v", "libx264", "-preset"].map(OsString::from));
        args.push(encode.preset.clone().into());
        args.push("-crf".into());
        args.push(encode.crf.to_string().into());
        args.push("-vf".into());
        args.push(format!("scale=-2:{}", encode.height).into());
    } else {
        args.extend(["-codec", "copy"].map(OsString::from));
    }

    args.push(output.into());
    args
}

/// Cut a section of `source` into `output`.
pub fn cut(
    source: &Path,
    start: f64,
    end: f64,
    reencode: bool,
    encode: &EncodeSettings,
    output: &Path,
) -> MediaResult<()> {
    if !source.exists() {
        return Err(MediaError::SourceNotFound(source.to_path_buf()));
    }

    run_checked(
        Command::new(TOOL).args(cut_args(source, start, end, reencode, encode, output)),
        TOOL,
    )?;

    tracing::info!(
        "Cut {:.3}s..{:.3}s of {} to {} ({})",
        start,
        end,
        source.display(),
        output.display(),
        if reencode { "re-encoded" } else { "stream copy" }
    );
    Ok(())
}

/// Arguments converting the first subtitle of `input` into `output`,
/// optionally limited to a time window that becomes the new zero.
pub(crate) fn subtitle_args(input: &Path, window: Option<(f64, f64)>, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-nostdin".into(), "-y".into(), "-i".into(), input.into()];
    if let Some((start, end)) = window {
        args.push("-ss".into());
        args.push(seconds(start).into());
        args.push("-to".into());
        args.push(seconds(end).into());
        args.push("-map".into());
        args.push("0".into());
    }
    args.push(output.into());
    args
}

/// Extract a subtitle track. Returns `false` when ffmpeg produced nothing,
/// which is the normal outcome for inputs without subtitles.
pub fn extract_subtitle(input: &Path, window: Option<(f64, f64)>, output: &Path) -> MediaResult<bool> {
    let result = run_unchecked(Command::new(TOOL).args(subtitle_args(input, window, output)), TOOL)?;

    if !result.status.success() {
        tracing::warn!(
            "No subtitle extracted from {} (exit code {:?})",
            input.display(),
            result.status.code()
        );
        return Ok(false);
    }
    Ok(output.exists())
}

/// Dump every attachment of `media` into the existing directory `dir`.
///
/// ffmpeg always exits with an error here because no output file is given,
/// so the status is ignored.
pub fn dump_attachments(media: &Path, dir: &Path) -> MediaResult<()> {
    let media = std::fs::canonicalize(media)?;
    run_unchecked(
        Command::new(TOOL)
            .current_dir(dir)
            .args(["-nostdin", "-y", "-dump_attachment:t", "", "-i"])
            .arg(&media),
        TOOL,
    )?;
    Ok(())
}

/// Timestamps (seconds) of frames whose scene score exceeds `threshold`.
pub fn scene_changes(path: &Path, threshold: f64) -> MediaResult<Vec<f64>> {
    let filter = format!("select='gt(scene,{})',showinfo", threshold);
    let output = run_checked(
        Command::new(TOOL)
            .args(["-nostdin", "-hide_banner", "-i"])
            .arg(path)
            .args(["-filter:v", &filter, "-an", "-f", "null", "-"]),
        TOOL,
    )?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    let scenes = parse_showinfo(&stderr)?;
    tracing::debug!("Detected {} scene changes in {}", scenes.len(), path.display());
    Ok(scenes)
}

/// Extract `pts_time` values from showinfo filter output.
fn parse_showinfo(output: &str) -> MediaResult<Vec<f64>> {
    let pts_regex = Regex::new(r"pts_time:\s*(\d+(?:\.\d*)?)")
        .map_err(|e| MediaError::invalid_output(TOOL, e.to_string()))?;

    Ok(output
        .lines()
        .filter_map(|line| pts_regex.captures(line))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
        .collect())
}
