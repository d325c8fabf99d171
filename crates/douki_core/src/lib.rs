//! Douki Core - backend logic for Douki.
//!
//! Re-synchronizes previously timed subtitle sections to a new release of a
//! video by matching audio fingerprints. This crate has no UI dependencies and
//! is driven by the `douki` command-line front end.

pub mod config;
pub mod fingerprint;
pub mod keyframes;
pub mod logging;
pub mod media;
pub mod pipeline;
pub mod stats;
pub mod store;
pub mod subtitles;
pub mod timestamp;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
