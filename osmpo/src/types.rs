//! Core types shared by extraction and merging.
//! The document reader produces these; the extractor reads them and the
//! merger updates their tags.

use std::{fmt::Display, ops::Range, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error::Error, formats::osm::Layout};

/// The three kinds of map feature a catalog entry can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Node,
    Way,
    Relation,
}

impl RecordKind {
    /// Element name used for this kind in OSM XML and in catalog references.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Node => "node",
            RecordKind::Way => "way",
            RecordKind::Relation => "relation",
        }
    }

    pub(crate) fn from_element_name(name: &[u8]) -> Option<Self> {
        match name {
            b"node" => Some(RecordKind::Node),
            b"way" => Some(RecordKind::Way),
            b"relation" => Some(RecordKind::Relation),
            _ => None,
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordKind::from_element_name(s.as_bytes())
            .ok_or_else(|| Error::UnknownRecordKind(s.to_string()))
    }
}

/// A single `key=value` pair attached to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
    /// Byte range of the `<tag>` element in the source document, if it came from one.
    pub(crate) span: Option<Range<usize>>,
    /// Set when the value no longer matches the source text.
    pub(crate) dirty: bool,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Tag {
            key: key.into(),
            value: value.into(),
            span: None,
            dirty: false,
        }
    }

    pub(crate) fn from_source(key: String, value: String, span: Range<usize>) -> Self {
        Tag {
            key,
            value,
            span: Some(span),
            dirty: false,
        }
    }
}

/// What [`Record::set_tag`] did to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagChange {
    /// The tag already held the requested value.
    Unchanged,
    /// An existing tag received a new value.
    Updated,
    /// A new tag was appended.
    Inserted,
}

/// One node, way or relation with its identity and ordered tags.
///
/// Keys are unique within a record; [`Record::set_tag`] keeps them that way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub kind: RecordKind,
    pub id: String,
    tags: Vec<Tag>,
    modified: bool,
    pub(crate) layout: Option<Layout>,
}

impl Record {
    pub fn new(kind: RecordKind, id: impl Into<String>) -> Self {
        Record {
            kind,
            id: id.into(),
            tags: Vec::new(),
            modified: false,
            layout: None,
        }
    }

    pub(crate) fn from_source(kind: RecordKind, id: String, layout: Layout) -> Self {
        Record {
            layout: Some(layout),
            ..Record::new(kind, id)
        }
    }

    /// Builder-style helper that adds or replaces a tag without marking the
    /// record as modified.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let tag = Tag::new(key, value);
        match self.tags.iter_mut().find(|t| t.key == tag.key) {
            Some(existing) => existing.value = tag.value,
            None => self.tags.push(tag),
        }
        self
    }

    pub(crate) fn push_source_tag(&mut self, tag: Tag) {
        if let Some(existing) = self.tags.iter_mut().find(|t| t.key == tag.key) {
            // Duplicate keys in the source: the later element wins.
            *existing = tag;
        } else {
            self.tags.push(tag);
        }
    }

    pub(crate) fn tag_entries(&self) -> &[Tag] {
        &self.tags
    }

    /// Iterates over `(key, value)` pairs in document order.
    pub fn tags(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|t| (t.key.as_str(), t.value.as_str()))
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.iter().any(|t| t.key == key)
    }

    /// A record is tagged when it carries at least one tag.
    pub fn is_tagged(&self) -> bool {
        !self.tags.is_empty()
    }

    /// Whether [`Record::set_tag`] has changed this record.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Sets `key` to `value`, marking the record modified unless the tag
    /// already held exactly that value.
    pub fn set_tag(&mut self, key: &str, value: &str) -> TagChange {
        match self.tags.iter_mut().find(|t| t.key == key) {
            Some(tag) if tag.value == value => TagChange::Unchanged,
            Some(tag) => {
                tag.value = value.to_string();
                tag.dirty = true;
                self.modified = true;
                TagChange::Updated
            }
            None => {
                let mut tag = Tag::new(key, value);
                tag.dirty = true;
                self.tags.push(tag);
                self.modified = true;
                TagChange::Inserted
            }
        }
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
