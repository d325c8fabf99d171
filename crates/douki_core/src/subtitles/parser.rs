//! ASS parser.
//!
//! Lines are sorted into the section they appear under. Inside a section,
//! `Key: value` lines are plain pairs until a `Format:` line appears; after
//! that they are records split by the format's field names, with the last
//! field taking the rest of the line verbatim so commas and padding in
//! dialogue text survive.

use crate::subtitles::error::ParseError;
use crate::subtitles::types::{AssDocument, Entry, Record, Section, EVENTS_SECTION};
use crate::timestamp::parse_timestamp;

/// Sections holding uuencoded data rather than key/value lines.
const VERBATIM_SECTIONS: [&str; 2] = ["Fonts", "Graphics"];

/// Parse ASS content into a document.
pub fn parse_ass(content: &str) -> Result<AssDocument, ParseError> {
    let mut doc = AssDocument::new();

    for (line_num, line) in content.lines().enumerate() {
        let line_num = line_num + 1;
        let line = line.trim_start_matches('\u{feff}');
        let line = line.strip_suffix('\r').unwrap_or(line);
        let header = line.trim();

        if header.is_empty() {
            continue;
        }

        if header.starts_with('[') && header.ends_with(']') {
            doc.sections.push(Section::new(&header[1..header.len() - 1]));
            continue;
        }

        // Trailing whitespace can belong to the last field of a record.
        let line = line.trim_start();

        let Some(section) = doc.sections.last_mut() else {
            return Err(ParseError::at_line(line_num, "content before the first section"));
        };

        if VERBATIM_SECTIONS.contains(&section.name.as_str())
            || line.starts_with(';')
            || line.starts_with('!')
        {
            section.body.push(Entry::Raw(line.to_string()));
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            section.body.push(Entry::Raw(line.to_string()));
            continue;
        };
        let key = key.trim();

        if key == "Format" {
            section.body.push(Entry::Format(parse_format_line(value)));
            continue;
        }

        let format = section
            .format()
            .map(<[String]>::to_vec)
            .or_else(|| default_format(&section.name));

        let entry = match format {
            Some(format) => {
                Entry::Record(parse_record(key, value.trim_start(), &format, line_num)?)
            }
            None => Entry::Pair {
                key: key.to_string(),
                value: value.trim().to_string(),
            },
        };
        section.body.push(entry);
    }

    Ok(doc)
}

/// Field names of a `Format:` line, in file case.
fn parse_format_line(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).collect()
}

fn parse_record(
    kind: &str,
    value: &str,
    format: &[String],
    line_num: usize,
) -> Result<Record, ParseError> {
    let parts: Vec<&str> = value.splitn(format.len().max(1), ',').collect();
    let is_event = kind == "Dialogue" || kind == "Comment";

    if is_event && parts.len() < format.len() {
        return Err(ParseError::invalid_event(
            line_num,
            format!("Expected {} fields, got {}", format.len(), parts.len()),
        ));
    }

    let fields: Vec<(String, String)> = format
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let value = match parts.get(i) {
                Some(part) if i + 1 == format.len() => *part,
                Some(part) => part.trim(),
                None => "",
            };
            (name.clone(), value.to_string())
        })
        .collect();
    let record = Record::new(kind, fields);

    if is_event {
        for field in ["Start", "End"] {
            let value = record.get(field).unwrap_or("");
            if parse_timestamp(value).is_err() {
                return Err(ParseError::invalid_time(line_num, value));
            }
        }
    }

    Ok(record)
}

/// Field layout assumed when a section has no `Format:` line.
fn default_format(section: &str) -> Option<Vec<String>> {
    let fields: &[&str] = if section == EVENTS_SECTION {
        &[
            "Layer", "Start", "End", "Style", "Name", "MarginL", "MarginR", "MarginV", "Effect",
            "Text",
        ]
    } else if section.contains("Styles") {
        &[
            "Name",
            "Fontname",
            "Fontsize",
            "PrimaryColour",
            "SecondaryColour",
            "OutlineColour",
            "BackColour",
            "Bold",
            "Italic",
            "Underline",
            "StrikeOut",
            "ScaleX",
            "ScaleY",
            "Spacing",
            "Angle",
            "BorderStyle",
            "Outline",
            "Shadow",
            "Alignment",
            "MarginL",
            "MarginR",
            "MarginV",
            "Encoding",
        ]
    } else {
        return None;
    };
    Some(fields.iter().map(|s| s.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\u{feff}[Script Info]
; Script generated by Aegisub
Title: Episode 1
ScriptType: v4.00+

[V4+ Styles]
Format: Name, Fontname, Fontsize
Style: Default,Arial,20
Style: Sign,Verdana,32

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
Dialogue: 0,0:00:01.00,0:00:04.00,Default,,0,0,0,,Hello, world!
Comment: 0,0:00:05.00,0:00:06.00,Default,,0,0,0,,note

[Fonts]
fontname: a.ttf
M:2?.MF>@
";

    #[test]
    fn parses_sections_in_order() {
        let doc = parse_ass(SAMPLE).unwrap();
        let names: Vec<&str> = doc.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Script Info", "V4+ Styles", "Events", "Fonts"]);
    }

    #[test]
    fn pairs_and_comments() {
        let doc = parse_ass(SAMPLE).unwrap();
        let info = doc.section("Script Info").unwrap();
        assert_eq!(info.get("Title"), Some("Episode 1"));
        assert_eq!(info.body[0], Entry::Raw("; Script generated by Aegisub".into()));
    }

    #[test]
    fn records_follow_format() {
        let doc = parse_ass(SAMPLE).unwrap();
        let styles: Vec<_> = doc.styles().unwrap().records().collect();
        assert_eq!(styles.len(), 2);
        assert_eq!(styles[1].name(), Some("Sign"));
        assert_eq!(styles[1].get("fontsize"), Some("32"));

        let events = doc.events().unwrap();
        let first = events.records().next().unwrap();
        assert!(first.is_dialogue());
        assert_eq!(first.get("Text"), Some("Hello, world!"));
        assert_eq!(first.start(), Some(1.0));
        assert_eq!(doc.dialogue().count(), 1);
    }

    #[test]
    fn font_data_is_verbatim() {
        let doc = parse_ass(SAMPLE).unwrap();
        let fonts = doc.section("Fonts").unwrap();
        assert_eq!(fonts.body.len(), 2);
        assert!(fonts.body.iter().all(|e| matches!(e, Entry::Raw(_))));
    }

    #[test]
    fn events_without_format_use_default_layout() {
        let doc = parse_ass("[Events]\nDialogue: 0,0:00:02.00,0:00:03.00,Default,,0,0,0,,Hi").unwrap();
        let record = doc.dialogue().next().unwrap();
        assert_eq!(record.style(), Some("Default"));
        assert_eq!(record.end(), Some(3.0));
    }

    #[test]
    fn bad_event_lines_are_errors() {
        let short = "[Events]\nFormat: Start, End, Text\nDialogue: 0:00:01.00";
        assert!(matches!(parse_ass(short), Err(ParseError::InvalidEvent { line: 3, .. })));

        let bad_time = "[Events]\nFormat: Start, End, Text\nDialogue: soon,0:00:01.00,x";
        assert!(matches!(parse_ass(bad_time), Err(ParseError::InvalidTime { line: 3, .. })));
    }

    #[test]
    fn text_padding_is_kept() {
        let doc = parse_ass(
            "[Events]\r\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\r\n\
             Dialogue: 0, 0:00:01.00 ,0:00:02.00,Default,,0,0,0,,  indented, text  \r\n",
        )
        .unwrap();
        let record = doc.dialogue().next().unwrap();
        assert_eq!(record.start(), Some(1.0));
        assert_eq!(record.get("Text"), Some("  indented, text  "));
    }

    #[test]
    fn content_before_section_is_rejected() {
        assert!(parse_ass("Title: x\n[Script Info]").is_err());
    }
}
