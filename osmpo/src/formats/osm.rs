//! Support for OSM XML documents.
//!
//! Only the top-level `node`, `way` and `relation` elements and their `tag`
//! children are interpreted. Everything else is kept as source text, so
//! writing a document back reproduces the input byte for byte except for
//! the records whose tags were changed.

use std::{
    fmt::Display,
    io::{BufRead, Read, Write},
    ops::Range,
};

use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use tracing::debug;

use crate::{
    entities::{self, EntityTable},
    error::Error,
    traits::Parser,
    types::{Record, RecordKind, Tag},
};

/// Where a record's markup sits in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Layout {
    start_tag: Range<usize>,
    /// `None` for a self-closing element.
    end_tag: Option<Range<usize>>,
    attributes: Vec<RawAttribute>,
}

impl Layout {
    fn span(&self) -> Range<usize> {
        let end = self
            .end_tag
            .as_ref()
            .map_or(self.start_tag.end, |end_tag| end_tag.end);
        self.start_tag.start..end
    }
}

/// An attribute exactly as written, value still escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawAttribute {
    name: String,
    value: String,
}

/// An OSM XML document held in memory together with its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    source: String,
    entities: EntityTable,
    records: Vec<Record>,
}

impl Document {
    pub fn parse(source: impl Into<String>) -> Result<Self, Error> {
        let source = source.into();
        let (entities, records) = scan(&source)?;
        Ok(Document {
            source,
            entities,
            records,
        })
    }

    /// Top-level records in document order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn find(&self, kind: RecordKind, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.kind == kind && r.id == id)
    }

    /// Entities declared in the document's DOCTYPE.
    pub fn entities(&self) -> &EntityTable {
        &self.entities
    }

    pub fn is_modified(&self) -> bool {
        self.records.iter().any(Record::is_modified)
    }

    /// Serialises the document.
    ///
    /// Modified records get `action="modify"`; all other text is copied from
    /// the source unchanged.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(self.source.len() + 256);
        let mut cursor = 0;
        for record in self.records.iter().filter(|r| r.is_modified()) {
            let Some(layout) = &record.layout else {
                continue;
            };
            let span = layout.span();
            out.push_str(&self.source[cursor..span.start]);
            render_record(&mut out, &self.source, record, layout);
            cursor = span.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_xml())
    }
}

impl Parser for Document {
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        Document::parse(source)
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        writer.write_all(self.to_xml().as_bytes())?;
        writer.flush().map_err(Error::Io)
    }
}

fn scan(source: &str) -> Result<(EntityTable, Vec<Record>), Error> {
    let mut reader = Reader::from_str(source);

    let mut entities = EntityTable::new();
    let mut records = Vec::new();
    let mut current: Option<Record> = None;
    let mut open_tag: Option<Tag> = None;
    // Number of elements open before the current event; records live at 1.
    let mut depth = 0usize;

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader.read_event()?;
        let end = reader.buffer_position() as usize;

        match event {
            Event::DocType(doctype) => {
                entities.extend_from_doctype(&String::from_utf8_lossy(&doctype));
            }
            Event::Start(element) => {
                match depth {
                    1 => current = begin_record(&element, start..end, &entities)?,
                    2 if current.is_some() => {
                        open_tag = read_tag(&element, start..end, &entities)?;
                    }
                    _ => {}
                }
                depth += 1;
            }
            Event::Empty(element) => match depth {
                1 => {
                    if let Some(record) = begin_record(&element, start..end, &entities)? {
                        records.push(record);
                    }
                }
                2 => {
                    if let Some(record) = current.as_mut() {
                        if let Some(tag) = read_tag(&element, start..end, &entities)? {
                            record.push_source_tag(tag);
                        }
                    }
                }
                _ => {}
            },
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                match depth {
                    1 => {
                        if let Some(mut record) = current.take() {
                            if let Some(layout) = record.layout.as_mut() {
                                layout.end_tag = Some(start..end);
                            }
                            records.push(record);
                        }
                    }
                    2 => {
                        if let (Some(record), Some(mut tag)) = (current.as_mut(), open_tag.take()) {
                            if let Some(span) = tag.span.as_mut() {
                                span.end = end;
                            }
                            record.push_source_tag(tag);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok((entities, records))
}

fn begin_record(
    element: &BytesStart<'_>,
    start_tag: Range<usize>,
    entities: &EntityTable,
) -> Result<Option<Record>, Error> {
    let Some(kind) = RecordKind::from_element_name(element.name().as_ref()) else {
        return Ok(None);
    };
    let attributes = raw_attributes(element)?;
    let id = attributes
        .iter()
        .find(|attribute| attribute.name == "id")
        .map(|attribute| entities::decode_with(&attribute.value, Some(entities), &[]).into_owned())
        .ok_or_else(|| {
            Error::InvalidDocument(format!(
                "{} element without id at byte {}",
                kind, start_tag.start
            ))
        })?;

    let layout = Layout {
        start_tag,
        end_tag: None,
        attributes,
    };
    Ok(Some(Record::from_source(kind, id, layout)))
}

/// Reads a `<tag>` child. `k`/`v` win over the `key`/`value` spelling.
fn read_tag(
    element: &BytesStart<'_>,
    span: Range<usize>,
    entities: &EntityTable,
) -> Result<Option<Tag>, Error> {
    if element.name().as_ref() != b"tag" {
        return Ok(None);
    }

    let mut key = None;
    let mut value = None;
    for attribute in raw_attributes(element)? {
        match attribute.name.as_str() {
            "k" => key = Some(attribute.value),
            "key" if key.is_none() => key = Some(attribute.value),
            "v" => value = Some(attribute.value),
            "value" if value.is_none() => value = Some(attribute.value),
            _ => {}
        }
    }

    let Some(key) = key else {
        debug!(byte = span.start, "skipping tag without key");
        return Ok(None);
    };
    let decode = |raw: &str| entities::decode_with(raw, Some(entities), &[]).into_owned();
    let value = value.as_deref().map(&decode).unwrap_or_default();
    Ok(Some(Tag::from_source(decode(&key), value, span)))
}

fn raw_attributes(element: &BytesStart<'_>) -> Result<Vec<RawAttribute>, Error> {
    element
        .attributes()
        .with_checks(false)
        .map(|attribute| {
            let attribute = attribute.map_err(|e| Error::XmlAttribute(e.to_string()))?;
            Ok(RawAttribute {
                name: String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
                value: String::from_utf8_lossy(&attribute.value).into_owned(),
            })
        })
        .collect()
}

fn render_record(out: &mut String, source: &str, record: &Record, layout: &Layout) {
    let name = record.kind.as_str();

    out.push('<');
    out.push_str(name);
    let mut has_action = false;
    for attribute in &layout.attributes {
        if attribute.name == "action" {
            has_action = true;
            push_attribute(out, "action", "modify");
        } else {
            push_attribute(out, &attribute.name, &attribute.value);
        }
    }
    if !has_action {
        push_attribute(out, "action", "modify");
    }
    out.push('>');

    let tags = record.tag_entries();
    let mut replaced: Vec<(&Range<usize>, &Tag)> = tags
        .iter()
        .filter(|tag| tag.dirty)
        .filter_map(|tag| tag.span.as_ref().map(|span| (span, tag)))
        .collect();
    replaced.sort_by_key(|(span, _)| span.start);
    let appended: Vec<&Tag> = tags.iter().filter(|tag| tag.span.is_none()).collect();

    let mut cursor = layout.start_tag.end;
    for (span, tag) in replaced {
        out.push_str(&source[cursor..span.start]);
        render_tag(out, tag);
        cursor = span.end;
    }

    match &layout.end_tag {
        Some(end_tag) => {
            // New tags go after the last child, before the whitespace that
            // indents the end tag.
            let inner = &source[cursor..end_tag.start];
            let content_len = inner.trim_end().len();
            out.push_str(&inner[..content_len]);
            if !appended.is_empty() {
                let indent = child_indent(source, record, layout);
                for tag in &appended {
                    out.push_str(&indent);
                    render_tag(out, tag);
                }
            }
            let trailing = &inner[content_len..];
            if !appended.is_empty() && !trailing.contains('\n') {
                // The end tag gets its own line under the record's start tag.
                out.push('\n');
                out.push_str(line_indent(source, layout.start_tag.start).unwrap_or(""));
            } else {
                out.push_str(trailing);
            }
            out.push_str(&source[end_tag.clone()]);
        }
        None => {
            let base = line_indent(source, layout.start_tag.start).unwrap_or("");
            for tag in appended {
                out.push('\n');
                out.push_str(base);
                out.push_str("  ");
                render_tag(out, tag);
            }
            out.push('\n');
            out.push_str(base);
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

fn render_tag(out: &mut String, tag: &Tag) {
    out.push_str("<tag");
    push_attribute(out, "k", &entities::encode(&tag.key));
    push_attribute(out, "v", &entities::encode(&tag.value));
    out.push_str("/>");
}

fn push_attribute(out: &mut String, name: &str, raw_value: &str) {
    let quote = if raw_value.contains('"') { '\'' } else { '"' };
    out.push(' ');
    out.push_str(name);
    out.push('=');
    out.push(quote);
    out.push_str(raw_value);
    out.push(quote);
}

/// Line break plus indentation for a new child of `record`.
fn child_indent(source: &str, record: &Record, layout: &Layout) -> String {
    let last_child = record
        .tag_entries()
        .iter()
        .filter_map(|tag| tag.span.as_ref().map(|span| span.start))
        .max();
    if let Some(indent) = last_child.and_then(|offset| line_indent(source, offset)) {
        return format!("\n{indent}");
    }
    let base = line_indent(source, layout.start_tag.start).unwrap_or("");
    format!("\n{base}  ")
}

/// The whitespace before `offset` on its line, if nothing else precedes it.
fn line_indent(source: &str, offset: usize) -> Option<&str> {
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let indent = &source[line_start..offset];
    indent
        .chars()
        .all(|c| c == ' ' || c == '\t')
        .then_some(indent)
}
