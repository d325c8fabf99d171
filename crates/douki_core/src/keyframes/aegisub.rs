//! Aegisub keyframe files.

/// Render scene change times as an Aegisub v1 keyframes file.
///
/// Frame numbers are rounded from `time * fps`; lines end with CRLF.
pub fn format_keyframes_file(scene_times: &[f64], fps: f64) -> String {
    let mut out = String::from("# keyframe format v1\r\nfps 0\r\n");
    for time in scene_times {
        out.push_str(&format!("{}\r\n", (time * fps).round() as u64));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_rounded_with_crlf() {
        let text = format_keyframes_file(&[1.0, 2.52], 23.976);
        assert_eq!(text, "# keyframe format v1\r\nfps 0\r\n24\r\n60\r\n");
    }

    #[test]
    fn no_scenes_still_has_header() {
        assert_eq!(format_keyframes_file(&[], 25.0), "# keyframe format v1\r\nfps 0\r\n");
    }
}
