//! Cut planning against decode keyframes.
//!
//! A stream copy can only start on a keyframe. When the closest keyframe is
//! near the requested start the section is cut losslessly from that keyframe,
//! otherwise video is re-encoded so the cut lands exactly on the request.

use crate::config::ExtractionSettings;

/// Largest distance (seconds) between the requested start and its closest
/// keyframe that still allows a lossless cut.
pub const MAX_KEYFRAME_GAP_SECS: f64 = 2.0;

/// Half-width (seconds) of the window keyframes are sampled in.
pub const KEYFRAME_WINDOW_SECS: f64 = 30.0;

/// Forward skew applied when the chosen keyframe is the last one known.
pub const NO_NEXT_KEYFRAME_OFFSET_SECS: f64 = 0.5;

/// Tunables for cut planning.
#[derive(Debug, Clone)]
pub struct CutConfig {
    /// Maximum keyframe distance for a lossless cut.
    pub max_keyframe_gap_secs: f64,
}

impl Default for CutConfig {
    fn default() -> Self {
        Self {
            max_keyframe_gap_secs: MAX_KEYFRAME_GAP_SECS,
        }
    }
}

impl From<&ExtractionSettings> for CutConfig {
    fn from(settings: &ExtractionSettings) -> Self {
        Self {
            max_keyframe_gap_secs: settings.max_keyframe_gap_secs,
        }
    }
}

/// Outcome of planning a section cut.
#[derive(Debug, Clone, PartialEq)]
pub struct CutPlan {
    /// Start the caller asked for (seconds).
    pub requested_start: f64,
    /// Start the cut should use (seconds).
    pub start: f64,
    /// Whether video has to be re-encoded.
    pub needs_reencode: bool,
    /// Keyframe closest to the requested start, if any were known.
    pub keyframe: Option<f64>,
}

impl CutPlan {
    /// The source can be used as is: nothing to trim and nothing to re-encode.
    pub fn can_use_source(&self) -> bool {
        !self.needs_reencode && self.requested_start == 0.0
    }

    /// Where the section media starts in source time. The cut start, or the
    /// requested start when the source is used uncut.
    pub fn media_start(&self) -> f64 {
        if self.can_use_source() {
            self.requested_start
        } else {
            self.start
        }
    }
}

/// Plan the cut of a section starting at `requested_start`.
///
/// `keyframes` are decode keyframe times sampled around the request. Without
/// video the cut is always lossless; with video but no keyframes a re-encode
/// is assumed.
pub fn plan_cut(
    requested_start: f64,
    keyframes: &[f64],
    has_video: bool,
    config: &CutConfig,
) -> CutPlan {
    if !has_video {
        return CutPlan {
            requested_start,
            start: requested_start,
            needs_reencode: false,
            keyframe: None,
        };
    }

    let mut sorted: Vec<f64> = keyframes.iter().copied().filter(|k| k.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let closest = sorted
        .iter()
        .enumerate()
        .map(|(index, &k)| (index, k, (k - requested_start).abs()))
        .min_by(|a, b| a.2.total_cmp(&b.2));

    let Some((index, keyframe, gap)) = closest else {
        tracing::debug!(
            "No keyframes near {:.3}s, re-encode assumed",
            requested_start
        );
        return CutPlan {
            requested_start,
            start: requested_start,
            needs_reencode: true,
            keyframe: None,
        };
    };

    if gap > config.max_keyframe_gap_secs {
        tracing::info!(
            "Fixed {:.3} to {:.3}: reencode is needed",
            requested_start,
            keyframe
        );
        return CutPlan {
            requested_start,
            start: requested_start,
            needs_reencode: true,
            keyframe: Some(keyframe),
        };
    }

    tracing::info!(
        "Fixed {:.3} to {:.3}: reencode is NOT needed",
        requested_start,
        keyframe
    );

    // A copy starting exactly on the keyframe timestamp sometimes resolves to
    // the previous keyframe, so skew two thirds of the way to the next one.
    let start = match sorted.get(index + 1) {
        Some(&next) => (keyframe * 2.0 + next) / 3.0,
        None => keyframe + NO_NEXT_KEYFRAME_OFFSET_SECS,
    };

    CutPlan {
        requested_start,
        start,
        needs_reencode: false,
        keyframe: Some(keyframe),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_keyframe_allows_copy_with_skew() {
        let plan = plan_cut(21.0, &[10.0, 20.0, 30.0], true, &CutConfig::default());
        assert!(!plan.needs_reencode);
        assert_eq!(plan.keyframe, Some(20.0));
        assert!((plan.start - 70.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn distant_keyframe_requires_reencode() {
        let plan = plan_cut(20.0, &[10.0, 50.0], true, &CutConfig::default());
        assert!(plan.needs_reencode);
        assert_eq!(plan.keyframe, Some(10.0));
        assert_eq!(plan.start, 20.0);
    }

    #[test]
    fn gap_of_exactly_two_seconds_is_lossless() {
        let plan = plan_cut(12.0, &[10.0, 40.0], true, &CutConfig::default());
        assert!(!plan.needs_reencode);
        assert!((plan.start - 20.0).abs() < 1e-9);
    }

    #[test]
    fn last_keyframe_uses_fixed_offset() {
        let plan = plan_cut(29.5, &[10.0, 20.0, 30.0], true, &CutConfig::default());
        assert!(!plan.needs_reencode);
        assert!((plan.start - 30.5).abs() < 1e-9);
    }

    #[test]
    fn unsorted_keyframes_are_ordered_first() {
        let plan = plan_cut(21.0, &[30.0, 10.0, 20.0], true, &CutConfig::default());
        assert!((plan.start - 70.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn missing_keyframes_with_video_reencodes() {
        let plan = plan_cut(5.0, &[], true, &CutConfig::default());
        assert!(plan.needs_reencode);
        assert_eq!(plan.start, 5.0);
        assert_eq!(plan.keyframe, None);
    }

    #[test]
    fn audio_only_never_reencodes() {
        let plan = plan_cut(5.0, &[], false, &CutConfig::default());
        assert!(!plan.needs_reencode);
        assert_eq!(plan.start, 5.0);
    }

    #[test]
    fn source_reused_only_from_zero_without_reencode() {
        let audio = plan_cut(0.0, &[], false, &CutConfig::default());
        assert!(audio.can_use_source());

        let video = plan_cut(0.0, &[], true, &CutConfig::default());
        assert!(!video.can_use_source());
    }

    #[test]
    fn uncut_source_starts_at_requested_time() {
        let plan = plan_cut(0.0, &[0.0, 1.0, 2.0], true, &CutConfig::default());
        assert!(plan.can_use_source());
        assert!((plan.start - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(plan.media_start(), 0.0);

        let cut = plan_cut(21.0, &[10.0, 20.0, 30.0], true, &CutConfig::default());
        assert_eq!(cut.media_start(), cut.start);
    }

    #[test]
    fn threshold_comes_from_config() {
        let config = CutConfig {
            max_keyframe_gap_secs: 0.5,
        };
        let plan = plan_cut(21.0, &[10.0, 20.0, 30.0], true, &config);
        assert!(plan.needs_reencode);
    }
}
