//! Preparing a cut subtitle for storage as a sync section.

use crate::subtitles::types::{AssDocument, Entry, Section, SCRIPT_INFO_SECTION};

const PROJECT_SECTION: &str = "Aegisub Project Garbage";

/// Editor view state that no longer applies to the cut media.
const STALE_PROJECT_KEYS: [&str; 4] = [
    "Video AR Value",
    "Video Zoom Percent",
    "Active Line",
    "Video Position",
];

/// Point the script at the files stored for section `id`.
///
/// The title becomes the id and the Aegisub project section references
/// `media` (and `<id>-keyframes.txt` when there is video), so opening the
/// stored subtitle in Aegisub loads the matching media.
pub fn tag_section_metadata(doc: &mut AssDocument, id: &str, media: &str, has_video: bool) {
    if let Some(info) = doc.section_mut(SCRIPT_INFO_SECTION) {
        info.set("Title", id);
    }

    if doc.position(PROJECT_SECTION).is_none() {
        let index = doc.sections.len().min(1);
        doc.sections.insert(index, Section::new(PROJECT_SECTION));
    }
    let Some(project) = doc.section_mut(PROJECT_SECTION) else {
        return;
    };

    project.set("Audio File", media);
    if has_video {
        project.set("Video File", media);
        project.set("Keyframes File", format!("{}-keyframes.txt", id));
    } else {
        project.remove("Video File");
        project.remove("Keyframes File");
    }
    for key in STALE_PROJECT_KEYS {
        project.remove(key);
    }
}

/// Keep only the `Format` line and dialogue starting before `duration`.
///
/// Returns the number of entries left in the events section, or `None` when
/// the script has no events section at all.
pub fn retain_section_dialogue(doc: &mut AssDocument, duration: f64) -> Option<usize> {
    let events = doc.events_mut()?;
    events.body.retain(|entry| match entry {
        Entry::Format(_) => true,
        Entry::Record(record) if record.is_dialogue() => {
            record.start().is_some_and(|start| start < duration)
        }
        _ => false,
    });
    Some(events.body.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitles::parse_ass;

    const SCRIPT: &str = "[Script Info]
Title: Original

[Aegisub Project Garbage]
Audio File: ../raw.mkv
Video File: ../raw.mkv
Video AR Value: 1.777778
Active Line: 12

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,one
Comment: 0,0:00:02.00,0:00:03.00,Default,,0,0,0,,note
Dialogue: 0,0:00:59.00,0:01:01.00,Default,,0,0,0,,two
Dialogue: 0,0:01:00.00,0:01:02.00,Default,,0,0,0,,three
";

    #[test]
    fn tags_video_section() {
        let mut doc = parse_ass(SCRIPT).unwrap();
        tag_section_metadata(&mut doc, "7", "7.mkv", true);

        assert_eq!(doc.section("Script Info").unwrap().get("Title"), Some("7"));
        let project = doc.section("Aegisub Project Garbage").unwrap();
        assert_eq!(project.get("Audio File"), Some("7.mkv"));
        assert_eq!(project.get("Video File"), Some("7.mkv"));
        assert_eq!(project.get("Keyframes File"), Some("7-keyframes.txt"));
        assert_eq!(project.get("Video AR Value"), None);
        assert_eq!(project.get("Active Line"), None);
    }

    #[test]
    fn audio_only_drops_video_keys() {
        let mut doc = parse_ass(SCRIPT).unwrap();
        tag_section_metadata(&mut doc, "op", "/media/op.flac", false);

        let project = doc.section("Aegisub Project Garbage").unwrap();
        assert_eq!(project.get("Audio File"), Some("/media/op.flac"));
        assert_eq!(project.get("Video File"), None);
        assert_eq!(project.get("Keyframes File"), None);
    }

    #[test]
    fn creates_project_section_after_script_info() {
        let mut doc = parse_ass("[Script Info]\nTitle: x\n\n[Events]\n").unwrap();
        tag_section_metadata(&mut doc, "3", "3.mkv", false);

        assert_eq!(doc.position("Aegisub Project Garbage"), Some(1));
        assert_eq!(doc.position("Events"), Some(2));
    }

    #[test]
    fn retains_dialogue_inside_section() {
        let mut doc = parse_ass(SCRIPT).unwrap();
        assert_eq!(retain_section_dialogue(&mut doc, 60.0), Some(3));
        assert_eq!(doc.dialogue().count(), 2);

        let mut no_events = parse_ass("[Script Info]\nTitle: x\n").unwrap();
        assert_eq!(retain_section_dialogue(&mut no_events, 60.0), None);
    }
}
