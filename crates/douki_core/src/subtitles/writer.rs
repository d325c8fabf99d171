//! ASS writer.

use crate::subtitles::types::{AssDocument, Entry};

/// Serialize a document back to ASS text.
///
/// Sections are separated by a blank line; records are written in the field
/// order they were parsed with.
pub fn write_ass(doc: &AssDocument) -> String {
    let mut output = String::new();

    for (i, section) in doc.sections.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(&format!("[{}]\n", section.name));

        for entry in &section.body {
            match entry {
                Entry::Pair { key, value } => {
                    output.push_str(&format!("{}: {}\n", key, value));
                }
                Entry::Format(fields) => {
                    output.push_str(&format!("Format: {}\n", fields.join(", ")));
                }
                Entry::Record(record) => {
                    let values: Vec<&str> = record.fields.iter().map(|(_, v)| v.as_str()).collect();
                    output.push_str(&format!("{}: {}\n", record.kind, values.join(",")));
                }
                Entry::Raw(line) => {
                    output.push_str(line);
                    output.push('\n');
                }
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitles::parse_ass;

    const SCRIPT: &str = "[Script Info]
; comment
Title: Test
ScriptType: v4.00+

[V4+ Styles]
Format: Name, Fontname, Fontsize
Style: Default,Arial,20

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
Dialogue: 0,0:00:01.00,0:00:04.00,Default,,0,0,0,,Hello, world!
";

    #[test]
    fn untouched_document_is_reproduced() {
        let doc = parse_ass(SCRIPT).unwrap();
        assert_eq!(write_ass(&doc), SCRIPT);
    }

    #[test]
    fn dialogue_whitespace_survives_round_trip() {
        let script = format!(
            "{}Dialogue: 0,0:00:05.00,0:00:06.00,Default,,0,0,0,,  indented text  \n\
             Comment: 0,0:00:07.00,0:00:08.00,Default,,0,0,0,,\ttab and space \n",
            SCRIPT
        );
        let doc = parse_ass(&script).unwrap();
        assert_eq!(write_ass(&doc), script);
    }

    #[test]
    fn edited_times_are_written() {
        let mut doc = parse_ass(SCRIPT).unwrap();
        let events = doc.events_mut().unwrap();
        for entry in &mut events.body {
            if let Entry::Record(record) = entry {
                record.set_start(61.5);
            }
        }
        let text = write_ass(&doc);
        assert!(text.contains("Dialogue: 0,0:01:01.50,0:00:04.00,Default,,0,0,0,,Hello, world!\n"));
    }
}
