//! Section-based ASS document model.
//!
//! The document keeps every section, entry and field in file order so that a
//! parse followed by a write only changes what the caller touched. Times stay
//! as text inside records and are converted on access.

use crate::timestamp::{format_timestamp, parse_timestamp};

/// An ASS script as an ordered list of sections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssDocument {
    pub sections: Vec<Section>,
}

impl AssDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the section named exactly `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.name == name)
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.name == name)
    }

    /// The `[Events]` section.
    pub fn events(&self) -> Option<&Section> {
        self.section(EVENTS_SECTION)
    }

    pub fn events_mut(&mut self) -> Option<&mut Section> {
        self.section_mut(EVENTS_SECTION)
    }

    /// Index of the first style section (`[V4+ Styles]`, `[V4 Styles]`, ...).
    pub fn styles_position(&self) -> Option<usize> {
        self.sections.iter().position(Section::is_styles)
    }

    pub fn styles(&self) -> Option<&Section> {
        self.sections.iter().find(|s| s.is_styles())
    }

    /// Dialogue records of the events section.
    pub fn dialogue(&self) -> impl Iterator<Item = &Record> {
        self.events()
            .into_iter()
            .flat_map(|s| s.records())
            .filter(|r| r.is_dialogue())
    }
}

pub(crate) const EVENTS_SECTION: &str = "Events";
pub(crate) const SCRIPT_INFO_SECTION: &str = "Script Info";
pub(crate) const DIALOGUE: &str = "Dialogue";
pub(crate) const STYLE: &str = "Style";

/// One `[Name]` block and its entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub name: String,
    pub body: Vec<Entry>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: Vec::new(),
        }
    }

    pub fn is_styles(&self) -> bool {
        self.name.contains("Styles")
    }

    /// Value of the first `key: value` pair with this key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.body.iter().find_map(|e| match e {
            Entry::Pair { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Update the first pair with this key, or append a new one.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let existing = self.body.iter_mut().find_map(|e| match e {
            Entry::Pair { key: k, value: v } if k == key => Some(v),
            _ => None,
        });
        match existing {
            Some(slot) => *slot = value,
            None => self.body.push(Entry::Pair {
                key: key.to_string(),
                value,
            }),
        }
    }

    /// Remove the first pair with this key.
    pub fn remove(&mut self, key: &str) -> bool {
        let index = self
            .body
            .iter()
            .position(|e| matches!(e, Entry::Pair { key: k, .. } if k == key));
        match index {
            Some(i) => {
                self.body.remove(i);
                true
            }
            None => false,
        }
    }

    /// The section's `Format:` line, if any.
    pub fn format(&self) -> Option<&[String]> {
        self.body.iter().find_map(|e| match e {
            Entry::Format(fields) => Some(fields.as_slice()),
            _ => None,
        })
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.body.iter().filter_map(|e| match e {
            Entry::Record(r) => Some(r),
            _ => None,
        })
    }
}

/// A line inside a section.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// `Key: value` outside a formatted block (Script Info, project garbage).
    Pair { key: String, value: String },
    /// `Format:` field names, in file case.
    Format(Vec<String>),
    /// A line laid out by the section's `Format:` (Style, Dialogue, Comment).
    Record(Record),
    /// Anything kept verbatim: comments and embedded font/graphic data.
    Raw(String),
}

impl Entry {
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Entry::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_dialogue(&self) -> bool {
        self.as_record().is_some_and(Record::is_dialogue)
    }
}

/// A formatted line: its kind (`Dialogue`, `Style`, ...) and named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub kind: String,
    pub fields: Vec<(String, String)>,
}

impl Record {
    pub fn new(kind: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            kind: kind.into(),
            fields,
        }
    }

    pub fn is_dialogue(&self) -> bool {
        self.kind == DIALOGUE
    }

    pub fn is_style(&self) -> bool {
        self.kind == STYLE
    }

    /// Field value by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace a field value. Returns `false` when the field does not exist.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.fields.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, v)) => {
                *v = value.into();
                true
            }
            None => false,
        }
    }

    pub fn start(&self) -> Option<f64> {
        self.time("Start")
    }

    pub fn end(&self) -> Option<f64> {
        self.time("End")
    }

    pub fn set_start(&mut self, seconds: f64) {
        self.set("Start", format_timestamp(seconds));
    }

    pub fn set_end(&mut self, seconds: f64) {
        self.set("End", format_timestamp(seconds));
    }

    pub fn name(&self) -> Option<&str> {
        self.get("Name")
    }

    pub fn style(&self) -> Option<&str> {
        self.get("Style")
    }

    fn time(&self, field: &str) -> Option<f64> {
        parse_timestamp(self.get(field)?).ok()
    }
}
