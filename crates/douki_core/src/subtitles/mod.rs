//! Subtitle processing module.
//!
//! # Components
//!
//! - **types**: Section-based ASS document model
//! - **parser** / **writer**: ASS text codec, round-trip safe for untouched lines
//! - **metadata**: Tagging and trimming cut subtitles before they are stored
//! - **merge**: Splicing matched sections into one synchronized script

mod error;
mod merge;
mod metadata;
mod parser;
mod types;
mod writer;

use std::fs;
use std::path::Path;

pub use error::{ParseError, SubtitleError};
pub use merge::{
    merge_tracks, MatchedTrack, MergedScript, RandomStyleIds, SequentialStyleIds, StyleIdGenerator,
};
pub use metadata::{retain_section_dialogue, tag_section_metadata};
pub use parser::parse_ass;
pub use types::{AssDocument, Entry, Record, Section};
pub use writer::write_ass;

/// Parse an ASS file from disk.
pub fn parse_file(path: impl AsRef<Path>) -> Result<AssDocument, SubtitleError> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).map_err(|e| SubtitleError::read(path.to_path_buf(), e))?;
    Ok(parse_ass(&content)?)
}

/// Write a document to disk as ASS.
pub fn write_file(doc: &AssDocument, path: impl AsRef<Path>) -> Result<(), SubtitleError> {
    let path = path.as_ref();
    fs::write(path, write_ass(doc)).map_err(|e| SubtitleError::write(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_and_write_file() {
        let content = "[Script Info]
Title: Test

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
Dialogue: 0,0:00:01.00,0:00:04.00,Default,,0,0,0,,Hello, world!
";
        let mut temp_file = NamedTempFile::with_suffix(".ass").unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let doc = parse_file(temp_file.path()).unwrap();
        assert_eq!(doc.dialogue().count(), 1);

        let output_file = NamedTempFile::with_suffix(".ass").unwrap();
        write_file(&doc, output_file.path()).unwrap();

        let reparsed = parse_file(output_file.path()).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = parse_file("/nonexistent/douki/missing.ass").unwrap_err();
        assert!(matches!(err, SubtitleError::ReadError { .. }));
        assert!(err.to_string().contains("missing.ass"));
    }
}
