//! End-to-end runs.
//!
//! - [`generate_sync_data`] cuts a section of a timed release and stores its
//!   fingerprints and subtitle.
//! - [`synchronize`] matches a new release against the stored sections and
//!   writes one merged subtitle.

mod errors;
mod generate;
mod synchronize;

pub use errors::{PipelineError, PipelineResult};
pub use generate::{generate_sync_data, GenerateOutcome, GenerateRequest, SubtitleOutcome};
pub use synchronize::{synchronize, SyncOutcome, SyncRequest, TrackMatch};
