//! Persisted sync sections.
//!
//! A data directory holds one section per id `N`:
//!
//! | File              | Content                                   |
//! |-------------------|-------------------------------------------|
//! | `N.json`          | fingerprint sequence (`[[offset, hash]]`) |
//! | `N.ass`           | subtitle timed against the section        |
//! | `N-attachments/`  | fonts and other attachments (optional)    |
//! | `N-keyframes.txt` | Aegisub keyframes file (optional)         |
//! | `N.mkv`           | cut media, when the source was trimmed    |
//!
//! The fingerprint file is what makes a section: a section without one is
//! invisible to synchronization.

mod error;

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

pub use error::{StoreError, StoreResult};

use crate::fingerprint::FingerprintSequence;

/// File layout of section `id` inside a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionPaths {
    dir: PathBuf,
    id: String,
}

impl SectionPaths {
    pub fn new(dir: impl Into<PathBuf>, id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fingerprints(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.id))
    }

    pub fn subtitle(&self) -> PathBuf {
        self.dir.join(format!("{}.ass", self.id))
    }

    pub fn attachments_dir(&self) -> PathBuf {
        self.dir.join(format!("{}-attachments", self.id))
    }

    pub fn keyframes(&self) -> PathBuf {
        self.dir.join(format!("{}-keyframes.txt", self.id))
    }

    pub fn media(&self) -> PathBuf {
        self.dir.join(format!("{}.mkv", self.id))
    }
}

/// A stored, already-timed subtitle section.
#[derive(Debug, Clone)]
pub struct SyncRecord {
    pub id: String,
    pub fingerprints: FingerprintSequence,
    pub subtitle_path: PathBuf,
    /// Files in the section's attachment directory, sorted by name.
    pub attachments: Vec<PathBuf>,
}

/// Next free numeric section id in `dir`, creating the directory if needed.
///
/// The id is one more than the largest number formed by the digits of any
/// `*.json` file name; names without digits count as zero.
pub fn next_section_id(dir: &Path) -> StoreResult<u64> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        return Ok(1);
    }

    let highest = fingerprint_stems(dir)?
        .iter()
        .map(|stem| digits_value(stem).unwrap_or(0))
        .max()
        .unwrap_or(0);
    Ok(highest + 1)
}

/// Load every section of `dir`, in section order.
///
/// Sections are ordered by the number in their id, then by id. Sections with
/// no subtitle file are skipped.
pub fn load_sync_records(dir: &Path) -> StoreResult<Vec<SyncRecord>> {
    let mut stems = fingerprint_stems(dir)?;
    stems.sort_by(|a, b| digits_value(a).cmp(&digits_value(b)).then_with(|| a.cmp(b)));

    let records = stems
        .par_iter()
        .map(|stem| load_record(&SectionPaths::new(dir, stem.as_str())))
        .collect::<StoreResult<Vec<_>>>()?;

    let records: Vec<SyncRecord> = records.into_iter().flatten().collect();
    tracing::debug!("Loaded {} sync sections from {}", records.len(), dir.display());
    Ok(records)
}

fn load_record(paths: &SectionPaths) -> StoreResult<Option<SyncRecord>> {
    let subtitle_path = paths.subtitle();
    if !subtitle_path.is_file() {
        tracing::warn!(
            "Skipping section '{}': no subtitle at {}",
            paths.id(),
            subtitle_path.display()
        );
        return Ok(None);
    }

    Ok(Some(SyncRecord {
        id: paths.id().to_string(),
        fingerprints: read_fingerprints(&paths.fingerprints())?,
        subtitle_path,
        attachments: list_attachments(&paths.attachments_dir())?,
    }))
}

/// Write a fingerprint sequence as JSON.
pub fn write_fingerprints(path: &Path, fingerprints: &FingerprintSequence) -> StoreResult<()> {
    let json = serde_json::to_string(fingerprints)?;
    fs::write(path, json).map_err(|e| StoreError::io(path, e))
}

/// Read a fingerprint sequence written by [`write_fingerprints`].
pub fn read_fingerprints(path: &Path) -> StoreResult<FingerprintSequence> {
    let content = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| StoreError::invalid_fingerprints(path, e))
}

/// Files inside an attachment directory. A missing directory is empty.
pub fn list_attachments(dir: &Path) -> StoreResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(dir, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| StoreError::io(dir, e))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Stems of the `*.json` files directly inside `dir`.
fn fingerprint_stems(dir: &Path) -> StoreResult<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut stems = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(stem) = name.strip_suffix(".json") {
            if entry.path().is_file() {
                stems.push(stem.to_string());
            }
        }
    }
    Ok(stems)
}

/// Number formed by all ASCII digits of `name`, if any.
fn digits_value(name: &str) -> Option<u64> {
    let digits: String = name.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}
