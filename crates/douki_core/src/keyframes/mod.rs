//! Keyframe-aligned section extraction planning.
//!
//! Decides whether a requested section of a source file can be cut with a
//! lossless stream copy or must be re-encoded, and where the cut starts.

mod aegisub;
mod planner;

pub use aegisub::format_keyframes_file;
pub use planner::{
    plan_cut, CutConfig, CutPlan, KEYFRAME_WINDOW_SECS, MAX_KEYFRAME_GAP_SECS,
    NO_NEXT_KEYFRAME_OFFSET_SECS,
};
