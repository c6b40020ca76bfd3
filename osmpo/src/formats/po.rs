//! Support for the gettext PO subset osmpo exchanges with translators.
//!
//! Each entry looks like this:
//!
//! ```text
//!
//! #. highway=primary
//! #. name=Main St
//! #: way:42:name
//! msgid "Main St"
//! msgstr ""
//! ```
//!
//! The parser is a pragmatic scraper of exactly this layout rather than a
//! validating PO reader: unknown lines are skipped and broken quoting is
//! extracted on a best-effort basis.

use std::{
    fmt::Display,
    io::{BufRead, Read, Write},
    str::FromStr,
};

use tracing::debug;

use crate::{error::Error, traits::Parser, types::RecordKind};

/// Escapes backslash, double quote, tab, CR and LF for a quoted PO string.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Reverses [`escape`]. Unknown escape sequences are kept as written.
pub fn unescape(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some('t') => unescaped.push('\t'),
            Some('r') => unescaped.push('\r'),
            Some('"') => unescaped.push('"'),
            Some('\\') => unescaped.push('\\'),
            Some(other) => {
                unescaped.push('\\');
                unescaped.push(other);
            }
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

/// The `type:id:tag` triple naming the record tag an entry was taken from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryReference {
    pub kind: RecordKind,
    pub id: String,
    pub tag: String,
}

impl EntryReference {
    pub fn new(kind: RecordKind, id: impl Into<String>, tag: impl Into<String>) -> Self {
        EntryReference {
            kind,
            id: id.into(),
            tag: tag.into(),
        }
    }
}

impl Display for EntryReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.id, self.tag)
    }
}

/// Splits on the first two colons only; the tag part may contain more.
impl FromStr for EntryReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(kind), Some(id), Some(tag)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(Error::InvalidReference(s.to_string()));
        };
        if id.is_empty() || tag.is_empty() {
            return Err(Error::InvalidReference(s.to_string()));
        }
        Ok(EntryReference {
            kind: kind.parse()?,
            id: id.to_string(),
            tag: tag.to_string(),
        })
    }
}

/// One catalog entry: where the text came from, the text, and its translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Extracted comments (`#.` lines), one `key=value` per tag of the record.
    pub comments: Vec<String>,
    /// `None` when the entry had no usable `#:` line.
    pub reference: Option<EntryReference>,
    /// The `msgid`.
    pub source_text: String,
    /// The `msgstr`; empty while untranslated.
    pub translated_text: String,
}

impl CatalogEntry {
    pub fn is_translated(&self) -> bool {
        !self.translated_text.is_empty()
    }
}

/// Renders the entry in the exchange layout, starting with its separating
/// blank line.
impl Display for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        for comment in &self.comments {
            // A raw line break would end the comment and could split the entry.
            writeln!(f, "#. {}", comment.replace('\r', "\\r").replace('\n', "\\n"))?;
        }
        if let Some(reference) = &self.reference {
            writeln!(f, "#: {}", reference)?;
        }
        writeln!(f, "msgid \"{}\"", escape(&self.source_text))?;
        writeln!(f, "msgstr \"{}\"", escape(&self.translated_text))
    }
}

/// A whole catalog file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
}

impl Parser for Catalog {
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Catalog {
            entries: parse(&text),
        })
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        for entry in &self.entries {
            write!(writer, "{}", entry)?;
        }
        writer.flush().map_err(Error::Io)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Msgid,
    Msgstr,
}

/// The entry being accumulated between blank lines.
#[derive(Debug, Default)]
struct PendingEntry {
    entry: CatalogEntry,
    started: bool,
    last_field: Option<Field>,
}

impl PendingEntry {
    fn commit_into(&mut self, entries: &mut Vec<CatalogEntry>) {
        let pending = std::mem::take(self);
        if pending.started {
            entries.push(pending.entry);
        }
    }

    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Msgid => self.entry.source_text = value,
            Field::Msgstr => self.entry.translated_text = value,
        }
        self.started = true;
        self.last_field = Some(field);
    }

    fn append(&mut self, field: Field, value: &str) {
        match field {
            Field::Msgid => self.entry.source_text.push_str(value),
            Field::Msgstr => self.entry.translated_text.push_str(value),
        }
    }
}

/// Parses catalog text into entries, in file order.
///
/// A blank line ends the current entry; the last entry is kept even without
/// a trailing blank line.
pub fn parse(text: &str) -> Vec<CatalogEntry> {
    let mut entries = Vec::new();
    let mut pending = PendingEntry::default();

    for (index, line) in text.lines().enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            pending.commit_into(&mut entries);
            continue;
        }

        if let Some(reference) = line.strip_prefix("#: ") {
            let reference = reference.trim();
            match reference.parse::<EntryReference>() {
                Ok(reference) => pending.entry.reference = Some(reference),
                Err(e) => debug!(line = index + 1, error = %e, "ignoring unusable reference"),
            }
            pending.started = true;
            pending.last_field = None;
        } else if let Some(comment) = line.strip_prefix("#. ") {
            pending.entry.comments.push(comment.to_string());
            pending.started = true;
            pending.last_field = None;
        } else if let Some(rest) = line.strip_prefix("msgid ") {
            pending.set(Field::Msgid, unescape(unquote(rest)));
        } else if let Some(rest) = line.strip_prefix("msgstr ") {
            pending.set(Field::Msgstr, unescape(unquote(rest)));
        } else if line.starts_with('"') {
            match pending.last_field {
                Some(field) => pending.append(field, &unescape(unquote(line))),
                None => debug!(line = index + 1, "ignoring string outside msgid/msgstr"),
            }
        } else {
            if !line.starts_with('#') {
                debug!(line = index + 1, "ignoring unrecognized catalog line");
            }
            pending.last_field = None;
        }
    }
    pending.commit_into(&mut entries);

    entries
}

/// Strips the surrounding quotes of a PO string, tolerating missing ones.
fn unquote(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix('"').unwrap_or(text);
    text.strip_suffix('"').unwrap_or(text)
}
