//! Timeline merge of matched subtitle sections.
//!
//! The first matched track is the primary: its document is the output
//! skeleton. Every further track contributes its dialogue, shifted by its own
//! delay, and its styles, renamed when a name is already taken.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::fingerprint::MatchResult;
use crate::subtitles::error::{ParseError, SubtitleError};
use crate::subtitles::types::{AssDocument, Entry, Record, Section, EVENTS_SECTION};

/// Source of replacement style names.
pub trait StyleIdGenerator {
    fn next_id(&mut self) -> String;
}

/// Random 8-hex-digit names.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomStyleIds;

impl StyleIdGenerator for RandomStyleIds {
    fn next_id(&mut self) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        id[..8].to_string()
    }
}

/// Predictable `prefix1`, `prefix2`, ... names.
#[derive(Debug, Clone)]
pub struct SequentialStyleIds {
    prefix: String,
    next: u32,
}

impl SequentialStyleIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl StyleIdGenerator for SequentialStyleIds {
    fn next_id(&mut self) -> String {
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

/// A subtitle section that passed matching.
#[derive(Debug, Clone)]
pub struct MatchedTrack {
    pub result: MatchResult,
    pub document: AssDocument,
    pub attachments: Vec<PathBuf>,
}

/// Output of [`merge_tracks`].
#[derive(Debug, Clone)]
pub struct MergedScript {
    pub document: AssDocument,
    /// Attachment files of every merged track, in track order.
    pub attachments: Vec<PathBuf>,
}

/// Splice matched tracks into one script.
///
/// Tracks must be in stored-section order; the first one is the primary.
/// Dialogue outside a track's `[from, to]` coverage (in its own, unshifted
/// time) is dropped. Primary events that would end before zero are dropped
/// and surviving starts clamp at zero.
pub fn merge_tracks(
    tracks: Vec<MatchedTrack>,
    ids: &mut dyn StyleIdGenerator,
) -> Result<MergedScript, SubtitleError> {
    let mut tracks = tracks.into_iter();
    let primary = tracks.next().ok_or(SubtitleError::NoTracks)?;

    let mut attachments = primary.attachments;
    let mut document = primary.document;
    let result = primary.result;

    {
        let events = document
            .events_mut()
            .ok_or_else(|| ParseError::MissingSection(EVENTS_SECTION.to_string()))?;
        let body = std::mem::take(&mut events.body);
        events.body = body
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Record(record) if record.is_dialogue() => {
                    shift_primary(record, &result).map(Entry::Record)
                }
                other => Some(other),
            })
            .collect();
    }

    for track in tracks {
        let MatchedTrack {
            result,
            document: extra,
            attachments: extra_attachments,
        } = track;

        let renames = merge_styles(&mut document, &extra, ids);

        let extra_events = extra
            .events()
            .ok_or_else(|| ParseError::MissingSection(EVENTS_SECTION.to_string()))?;
        let shifted: Vec<Entry> = extra_events
            .records()
            .filter(|r| r.is_dialogue())
            .filter_map(|r| shift_secondary(r.clone(), &result, &renames))
            .map(Entry::Record)
            .collect();

        tracing::debug!(
            "Merged {} events with delay {:.3}s, {} styles renamed",
            shifted.len(),
            result.delay,
            renames.len()
        );

        if let Some(events) = document.events_mut() {
            events.body.extend(shifted);
        }
        attachments.extend(extra_attachments);
    }

    if let Some(events) = document.events_mut() {
        sort_events(&mut events.body);
    }

    Ok(MergedScript {
        document,
        attachments,
    })
}

/// Whether an event lies entirely outside the coverage window.
fn outside_coverage(start: f64, end: f64, result: &MatchResult) -> bool {
    start > result.to || end < result.from
}

fn shift_primary(mut record: Record, result: &MatchResult) -> Option<Record> {
    let (start, end) = (record.start()?, record.end()?);
    let shifted_end = end + result.delay;
    if outside_coverage(start, end, result) || shifted_end < 0.0 {
        return None;
    }
    record.set_start((start + result.delay).max(0.0));
    record.set_end(shifted_end);
    Some(record)
}

fn shift_secondary(
    mut record: Record,
    result: &MatchResult,
    renames: &HashMap<String, String>,
) -> Option<Record> {
    let (start, end) = (record.start()?, record.end()?);
    if outside_coverage(start, end, result) {
        return None;
    }
    record.set_start(start + result.delay);
    record.set_end(end + result.delay);

    if let Some(renamed) = record.style().and_then(|s| renames.get(s)).cloned() {
        record.set("Style", renamed);
    }
    Some(record)
}

/// Append the extra track's style definitions to the primary's style
/// section, renaming those whose name is already defined there.
///
/// Returns the old-to-new name map for remapping the track's events.
fn merge_styles(
    document: &mut AssDocument,
    extra: &AssDocument,
    ids: &mut dyn StyleIdGenerator,
) -> HashMap<String, String> {
    let mut renames = HashMap::new();
    let Some(extra_styles) = extra.styles() else {
        return renames;
    };

    let styles_index = match document.styles_position() {
        Some(index) => index,
        None => {
            let mut section = Section::new(extra_styles.name.clone());
            if let Some(format) = extra_styles.format() {
                section.body.push(Entry::Format(format.to_vec()));
            }
            let index = document.position(EVENTS_SECTION).unwrap_or(document.sections.len());
            document.sections.insert(index, section);
            index
        }
    };
    let styles = &mut document.sections[styles_index];

    let existing: HashSet<String> = styles
        .records()
        .filter(|r| r.is_style())
        .filter_map(|r| r.name().map(str::to_string))
        .collect();
    let incoming: Vec<Record> = extra_styles.records().filter(|r| r.is_style()).cloned().collect();
    let mut taken: HashSet<String> = existing.clone();
    taken.extend(incoming.iter().filter_map(|r| r.name().map(str::to_string)));

    for mut style in incoming {
        if let Some(name) = style.name().map(str::to_string) {
            if existing.contains(&name) {
                let fresh = loop {
                    let candidate = ids.next_id();
                    if !taken.contains(&candidate) {
                        break candidate;
                    }
                };
                taken.insert(fresh.clone());
                style.set("Name", fresh.as_str());
                renames.insert(name, fresh);
            }
        }
        styles.body.push(Entry::Record(style));
    }

    renames
}

/// Stable order: `Format` first, then other non-dialogue lines, then dialogue
/// by start time.
fn sort_events(body: &mut Vec<Entry>) {
    let mut keyed: Vec<((u8, f64), Entry)> = std::mem::take(body)
        .into_iter()
        .map(|entry| {
            let key = match &entry {
                Entry::Format(_) => (0, 0.0),
                Entry::Record(r) if r.is_dialogue() => (2, r.start().unwrap_or(0.0)),
                _ => (1, 0.0),
            };
            (key, entry)
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| match a.0.cmp(&b.0) {
        Ordering::Equal => a.1.total_cmp(&b.1),
        other => other,
    });

    *body = keyed.into_iter().map(|(_, entry)| entry).collect();
}
