//! Error types for pipeline runs.
//!
//! Collaborator errors pass through unchanged; a run either completes or
//! fails with the first error it hit.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::media::MediaError;
use crate::store::StoreError;
use crate::subtitles::SubtitleError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Subtitle(#[from] SubtitleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// End of the requested section is not after its start.
    #[error("Section end {end:.3}s is not after its start {start:.3}s")]
    EmptySection { start: f64, end: f64 },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
