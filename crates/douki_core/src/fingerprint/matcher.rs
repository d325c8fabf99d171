//! Delay estimation from fingerprint matches.
//!
//! Every needle fingerprint is looked up in the haystack by hash, giving one
//! or more candidate delays. Ambiguous candidates are resolved against the
//! previous entry's delay, then the delay samples are trimmed with a graduated
//! interquartile filter until their spread is small enough.
//!
//! All thresholds are in raw offset units; only the final delay and coverage
//! bounds are converted to seconds.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;

use super::types::Fingerprint;
use crate::config::MatchSettings;
use crate::stats::{filter_outliers, mean, standard_deviation, DEFAULT_IQR_MULTIPLIER};

/// Minimum number of surviving samples; a match needs strictly more.
pub const MIN_MATCH_COUNT: usize = 10;

/// Spread above which a match is rejected.
pub const MAX_ALLOWED_DEVIATION: f64 = 750.0;

/// Spread at which trimming stops early.
pub const TARGET_DEVIATION: f64 = 200.0;

/// Trim factors tried in order, tightest fence first.
pub const TRIM_FACTORS: [f64; 3] = [0.25, 0.30, 0.35];

/// Matching thresholds.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub min_match_count: usize,
    pub max_deviation: f64,
    pub target_deviation: f64,
    pub trim_factors: Vec<f64>,
    pub iqr_multiplier: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_match_count: MIN_MATCH_COUNT,
            max_deviation: MAX_ALLOWED_DEVIATION,
            target_deviation: TARGET_DEVIATION,
            trim_factors: TRIM_FACTORS.to_vec(),
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
        }
    }
}

impl From<&MatchSettings> for MatchConfig {
    fn from(settings: &MatchSettings) -> Self {
        Self {
            min_match_count: settings.min_match_count as usize,
            max_deviation: settings.max_deviation,
            target_deviation: settings.target_deviation,
            trim_factors: trim_factor_range(
                settings.trim_factor_start,
                settings.trim_factor_end,
                settings.trim_factor_step,
            ),
            iqr_multiplier: settings.iqr_multiplier,
        }
    }
}

/// Inclusive `start..=end` range of trim factors.
///
/// Steps are counted in integers so `0.25 + 2 * 0.05` still reaches `0.35`.
fn trim_factor_range(start: f64, end: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 || end < start {
        return vec![start];
    }
    let steps = ((end - start) / step + 1e-9).floor() as usize;
    (0..=steps).map(|i| start + i as f64 * step).collect()
}

/// Confident alignment of one needle sequence against the haystack.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Seconds to add to the needle's timeline. Never negative.
    pub delay: f64,
    /// First needle time (seconds) backed by a surviving match.
    pub from: f64,
    /// Last needle time (seconds) backed by a surviving match.
    pub to: f64,
    /// Number of delay samples that survived trimming.
    pub match_count: usize,
    /// Population standard deviation of the surviving samples, in offset units.
    pub deviation: f64,
}

/// Haystack fingerprints grouped by hash, offsets kept in haystack order.
#[derive(Debug, Default)]
pub struct HaystackIndex {
    offsets_by_hash: HashMap<u32, Vec<u32>>,
}

impl HaystackIndex {
    pub fn new(haystack: &[Fingerprint]) -> Self {
        let mut offsets_by_hash: HashMap<u32, Vec<u32>> = HashMap::new();
        for fp in haystack {
            offsets_by_hash.entry(fp.hash).or_default().push(fp.offset);
        }
        Self { offsets_by_hash }
    }

    fn offsets(&self, hash: u32) -> &[u32] {
        self.offsets_by_hash
            .get(&hash)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Estimate the delay of every needle against one haystack.
///
/// Returns `(needle index, result)` for the needles that matched, in needle
/// order. Needles that miss the confidence bar are left out.
pub fn estimate_delays<N>(
    haystack: &[Fingerprint],
    needles: &[N],
    timing_factor: f64,
    config: &MatchConfig,
) -> Vec<(usize, MatchResult)>
where
    N: AsRef<[Fingerprint]> + Sync,
{
    let index = HaystackIndex::new(haystack);
    needles
        .par_iter()
        .enumerate()
        .filter_map(|(i, needle)| {
            match_needle(&index, needle.as_ref(), timing_factor, config).map(|result| (i, result))
        })
        .collect()
}

/// Match a single needle sequence.
pub fn match_needle(
    index: &HaystackIndex,
    needle: &[Fingerprint],
    timing_factor: f64,
    config: &MatchConfig,
) -> Option<MatchResult> {
    let matches = resolve_matches(index, needle);
    let delays: Vec<f64> = matches.iter().map(|&(_, delay)| delay as f64).collect();

    let (filtered, deviation) = graduated_filter(&delays, config)?;

    let confident = filtered.len() > config.min_match_count && deviation < config.max_deviation;
    if !confident {
        tracing::debug!(
            "Rejected needle: {} samples, deviation {:.1}",
            filtered.len(),
            deviation
        );
        return None;
    }

    let average = mean(&filtered)?;
    let kept: HashSet<i64> = filtered.iter().map(|&d| d as i64).collect();
    let (first, last) = matches
        .iter()
        .filter(|(_, delay)| kept.contains(delay))
        .fold((u32::MAX, u32::MIN), |(lo, hi), &(offset, _)| {
            (lo.min(offset), hi.max(offset))
        });

    Some(MatchResult {
        delay: (average * timing_factor).max(0.0),
        from: first as f64 * timing_factor,
        to: last as f64 * timing_factor,
        match_count: filtered.len(),
        deviation,
    })
}

/// Needle offsets paired with one resolved delay each.
///
/// Needle fingerprints without a haystack hit are dropped. When a hash hits
/// several times, the candidate closest to the previous entry's delay wins
/// (the first entry is compared against zero).
fn resolve_matches(index: &HaystackIndex, needle: &[Fingerprint]) -> Vec<(u32, i64)> {
    let mut resolved = Vec::with_capacity(needle.len());
    let mut previous = 0i64;

    for fp in needle {
        let candidates = index.offsets(fp.hash);
        let best = candidates
            .iter()
            .map(|&hay| i64::from(hay) - i64::from(fp.offset))
            .min_by_key(|delay| (delay - previous).abs());
        if let Some(delay) = best {
            resolved.push((fp.offset, delay));
            previous = delay;
        }
    }

    resolved
}

/// Trim delay samples with increasing factors.
///
/// A factor's result is accepted unless it leaves fewer than
/// `min_match_count` samples after an earlier factor was already accepted.
/// Stops at the first accepted result whose deviation is under the target.
/// The outcome is the best spread reached within the range, which may still
/// be above the target.
fn graduated_filter(delays: &[f64], config: &MatchConfig) -> Option<(Vec<f64>, f64)> {
    let mut accepted: Option<(Vec<f64>, f64)> = None;

    for &factor in &config.trim_factors {
        let current = filter_outliers(delays, factor, config.iqr_multiplier);
        if accepted.is_some() && current.len() < config.min_match_count {
            break;
        }
        let deviation = if current.is_empty() {
            f64::INFINITY
        } else {
            standard_deviation(&current)
        };
        let settled = deviation < config.target_deviation;
        accepted = Some((current, deviation));
        if settled {
            break;
        }
    }

    accepted
}
