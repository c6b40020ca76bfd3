//! XML character and entity reference decoding and encoding.
//!
//! OSM extracts frequently carry tag values that were escaped twice by some
//! upstream tool (`&amp;quot;` in the file, `&quot;` after XML parsing).
//! [`decode`] resolves such leftover references in text that has already been
//! through an XML parser, and [`encode`] produces attribute-safe text that
//! [`decode`] turns back into the original.

use std::{borrow::Cow, collections::HashMap};

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::debug;

lazy_static! {
    static ref REFERENCE_REGEX: Regex =
        Regex::new(r"&(?:([\w:][-\w.:]*)|#0*([0-9]+)|#x0*([0-9a-fA-F]+));").unwrap();
    static ref LINE_ENDING_REGEX: Regex = Regex::new(r"\r\n?").unwrap();
    static ref ENTITY_DECLARATION_REGEX: Regex =
        Regex::new(r#"<!ENTITY\s+([\w:][-\w.:]*)\s+(?:"([^"]*)"|'([^']*)')\s*>"#).unwrap();
}

/// The predefined XML entities other than `amp`, which is resolved in place.
const DEFAULT_ENTITIES: [(&str, &str); 4] =
    [("gt", ">"), ("lt", "<"), ("quot", "\""), ("apos", "'")];

/// Named entities declared by a document, consulted before the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityTable {
    entries: HashMap<String, String>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the internal `<!ENTITY name "value">` declarations of a DOCTYPE.
    ///
    /// External (`SYSTEM`/`PUBLIC`) and parameter entities are ignored.
    pub fn from_doctype(doctype: &str) -> Self {
        let mut table = Self::new();
        table.extend_from_doctype(doctype);
        table
    }

    pub fn extend_from_doctype(&mut self, doctype: &str) {
        for caps in ENTITY_DECLARATION_REGEX.captures_iter(doctype) {
            let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            self.insert(&caps[1], value);
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decodes references using only the predefined entities.
pub fn decode(text: &str) -> Cow<'_, str> {
    decode_with(text, None, &[])
}

/// Decodes numeric character references, named entity references and
/// `&amp;`.
///
/// Line endings are normalised to `\n` first. Names listed in `excluded` are
/// passed through untouched (listing `amp` also keeps `&amp;`). References
/// that cannot be resolved stay in the output as literal text.
pub fn decode_with<'a>(
    text: &'a str,
    entities: Option<&EntityTable>,
    excluded: &[&str],
) -> Cow<'a, str> {
    let normalized = LINE_ENDING_REGEX.replace_all(text, "\n");
    if !REFERENCE_REGEX.is_match(&normalized) {
        return normalized;
    }

    // One pass: text produced by a substitution is never scanned again, so an
    // `&` coming out of `&amp;` or `&#38;` cannot start a new reference.
    let substituted = REFERENCE_REGEX.replace_all(&normalized, |caps: &Captures<'_>| {
        resolve_reference(caps, entities, excluded).unwrap_or_else(|| caps[0].to_string())
    });
    Cow::Owned(substituted.into_owned())
}

fn resolve_reference(
    caps: &Captures<'_>,
    entities: Option<&EntityTable>,
    excluded: &[&str],
) -> Option<String> {
    if let Some(decimal) = caps.get(2) {
        return code_point(decimal.as_str(), 10).or_else(|| {
            debug!(reference = &caps[0], "invalid character reference left literal");
            None
        });
    }
    if let Some(hex) = caps.get(3) {
        return code_point(hex.as_str(), 16).or_else(|| {
            debug!(reference = &caps[0], "invalid character reference left literal");
            None
        });
    }

    let name = caps.get(1)?.as_str();
    if excluded.contains(&name) {
        return None;
    }
    if name == "amp" {
        return Some("&".to_string());
    }

    if let Some(value) = entities.and_then(|table| table.get(name)) {
        // A declared entity may itself contain references, but never its own name.
        let mut nested = excluded.to_vec();
        nested.push(name);
        return Some(decode_with(value, entities, &nested).into_owned());
    }

    match DEFAULT_ENTITIES.iter().find(|(entity, _)| *entity == name) {
        Some((_, value)) => Some(value.to_string()),
        None => {
            debug!(reference = name, "unresolved entity reference left literal");
            None
        }
    }
}

fn code_point(digits: &str, radix: u32) -> Option<String> {
    let value = u32::from_str_radix(digits, radix).ok()?;
    if value == 0 {
        return None;
    }
    char::from_u32(value).map(String::from)
}

/// Escapes text for use inside a double-quoted XML attribute value.
///
/// Tab, CR and LF become character references so attribute value
/// normalisation cannot fold them into spaces.
pub fn encode(text: &str) -> Cow<'_, str> {
    let needs_escaping = text.contains(|c: char| {
        matches!(c, '&' | '<' | '>' | '"' | '\t' | '\r' | '\n')
    });
    if !needs_escaping {
        return Cow::Borrowed(text);
    }

    let mut encoded = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => encoded.push_str("&amp;"),
            '<' => encoded.push_str("&lt;"),
            '>' => encoded.push_str("&gt;"),
            '"' => encoded.push_str("&quot;"),
            '\t' => encoded.push_str("&#9;"),
            '\n' => encoded.push_str("&#10;"),
            '\r' => encoded.push_str("&#13;"),
            c => encoded.push(c),
        }
    }
    Cow::Owned(encoded)
}
