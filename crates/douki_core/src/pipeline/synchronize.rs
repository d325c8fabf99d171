//! Subtitle synchronization run.
//!
//! Fingerprints a new release, finds every stored section in it and merges
//! the matched sections' subtitles into one script timed against the release.

use std::fs;
use std::path::{Path, PathBuf};

use super::errors::{PipelineError, PipelineResult};
use crate::config::Settings;
use crate::fingerprint::{estimate_delays, Fingerprint, FingerprintSource, MatchConfig, MatchResult};
use crate::store::{self, SyncRecord};
use crate::subtitles::{self, merge_tracks, MatchedTrack, StyleIdGenerator};

/// Input of [`synchronize`].
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// Release to time the subtitle against.
    pub source: PathBuf,
    /// Directory of stored sync sections.
    pub sync_dir: PathBuf,
    /// Output `.ass` file, or a directory to create a uniquely named one in.
    pub target: PathBuf,
}

/// A stored section found in the release.
#[derive(Debug, Clone)]
pub struct TrackMatch {
    pub id: String,
    pub subtitle_path: PathBuf,
    pub result: MatchResult,
}

/// Result of a synchronization run.
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// No stored section matched confidently. Nothing was written.
    NoMatch,
    Synced {
        subtitle: PathBuf,
        /// Attachments of the matched sections; copying or muxing them is up
        /// to the caller.
        attachments: Vec<PathBuf>,
        matches: Vec<TrackMatch>,
    },
}

/// Time the stored sections' subtitles against `request.source`.
pub fn synchronize(
    request: &SyncRequest,
    fingerprinter: &dyn FingerprintSource,
    settings: &Settings,
    ids: &mut dyn StyleIdGenerator,
) -> PipelineResult<SyncOutcome> {
    let (haystack, records) = rayon::join(
        || fingerprinter.fingerprint_file(&request.source),
        || store::load_sync_records(&request.sync_dir),
    );
    let haystack = haystack?;
    let records = records?;
    tracing::debug!(
        "Haystack has {} fingerprints, {} stored sections",
        haystack.len(),
        records.len()
    );

    let needles: Vec<&[Fingerprint]> =
        records.iter().map(|r| r.fingerprints.as_slice()).collect();
    let config = MatchConfig::from(&settings.matching);
    let timing_factor = fingerprinter.timing_factor();
    let matched = estimate_delays(&haystack, &needles, timing_factor, &config);

    if matched.is_empty() {
        tracing::info!("No stored section matched {}", request.source.display());
        return Ok(SyncOutcome::NoMatch);
    }

    let mut tracks = Vec::with_capacity(matched.len());
    let mut matches = Vec::with_capacity(matched.len());
    for (index, result) in matched {
        let SyncRecord {
            id,
            subtitle_path,
            attachments,
            ..
        } = &records[index];

        tracing::info!(
            "{} from {:.3} to {:.3} got {} matches in {:.3} with deviation {:.1}",
            id,
            result.from,
            result.to,
            result.match_count,
            result.delay,
            result.deviation
        );

        tracks.push(MatchedTrack {
            result: result.clone(),
            document: subtitles::parse_file(subtitle_path)?,
            attachments: attachments.clone(),
        });
        matches.push(TrackMatch {
            id: id.clone(),
            subtitle_path: subtitle_path.clone(),
            result,
        });
    }

    let merged = merge_tracks(tracks, ids)?;
    let subtitle = output_path(&request.target)?;
    subtitles::write_file(&merged.document, &subtitle)?;
    tracing::info!("Wrote {}", subtitle.display());

    Ok(SyncOutcome::Synced {
        subtitle,
        attachments: merged.attachments,
        matches,
    })
}

/// `target` itself when it names an `.ass` file, otherwise a fresh
/// `<random>.synced.ass` inside the `target` directory.
fn output_path(target: &Path) -> PipelineResult<PathBuf> {
    let is_ass = target
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ass"));

    let (dir, path) = if is_ass {
        let dir = target.parent().unwrap_or(Path::new("")).to_path_buf();
        (dir, target.to_path_buf())
    } else {
        let name = format!("{}.synced.ass", uuid::Uuid::new_v4().simple());
        (target.to_path_buf(), target.join(name))
    };

    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(&dir).map_err(|e| PipelineError::io(&dir, e))?;
    }
    Ok(path)
}
