//! Fingerprint data types.

use serde::{Deserialize, Serialize};

/// One audio landmark: the frame it was anchored at and its hash.
///
/// Serialized as a two-element array `[offset, hash]`, the format sync data
/// files are stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct Fingerprint {
    /// Frame index in fingerprinter units.
    pub offset: u32,
    /// Landmark hash.
    pub hash: u32,
}

impl Fingerprint {
    pub fn new(offset: u32, hash: u32) -> Self {
        Self { offset, hash }
    }
}

impl From<(u32, u32)> for Fingerprint {
    fn from((offset, hash): (u32, u32)) -> Self {
        Self { offset, hash }
    }
}

impl From<Fingerprint> for (u32, u32) {
    fn from(fp: Fingerprint) -> Self {
        (fp.offset, fp.hash)
    }
}

/// Time-ordered fingerprints of one audio stream.
pub type FingerprintSequence = Vec<Fingerprint>;
