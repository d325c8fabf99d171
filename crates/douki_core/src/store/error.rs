//! Error types for the sync data store.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failures reading or writing stored sync sections.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid fingerprint file '{path}': {source}")]
    InvalidFingerprints {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize fingerprints: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn invalid_fingerprints(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::InvalidFingerprints {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
