//! Import path: translated catalog entries merged back into a document.

use std::collections::HashMap;

use tracing::debug;

use crate::{
    formats::{osm::Document, po::CatalogEntry},
    types::{RecordKind, TagChange},
};

/// Settings for one import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// Translations are written to `<key>:<language>`.
    pub language: String,
}

impl ImportConfig {
    pub fn new(language: impl Into<String>) -> Self {
        ImportConfig {
            language: language.into(),
        }
    }

    fn destination_key(&self, tag: &str) -> String {
        format!("{}:{}", tag, self.language)
    }
}

/// What a merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub modified_records: usize,
    pub updated_tags: usize,
    pub inserted_tags: usize,
    pub unchanged_tags: usize,
    /// Translated entries whose record is not in the document.
    pub dangling_entries: usize,
}

type EntryIndex<'e> = HashMap<RecordKind, HashMap<&'e str, Vec<&'e CatalogEntry>>>;

fn index_entries(entries: &[CatalogEntry]) -> EntryIndex<'_> {
    let mut index = EntryIndex::new();
    for entry in entries.iter().filter(|entry| entry.is_translated()) {
        let Some(reference) = &entry.reference else {
            debug!(msgid = %entry.source_text, "skipping translated entry without reference");
            continue;
        };
        let pending = index
            .entry(reference.kind)
            .or_default()
            .entry(reference.id.as_str())
            .or_default();
        // One value per destination tag: the entry further down the catalog wins.
        match pending.iter_mut().find(|earlier| {
            earlier
                .reference
                .as_ref()
                .is_some_and(|other| other.tag == reference.tag)
        }) {
            Some(earlier) => {
                debug!(reference = %reference, "later catalog entry replaces an earlier one");
                *earlier = entry;
            }
            None => pending.push(entry),
        }
    }
    index
}

/// Applies translated entries to `document` in place.
///
/// Untranslated entries are ignored, an existing translation tag is only
/// touched when its value differs, and entries for records missing from the
/// document are dropped. Running the same merge twice changes nothing the
/// second time.
pub fn merge_into(
    document: &mut Document,
    entries: &[CatalogEntry],
    config: &ImportConfig,
) -> MergeSummary {
    let mut index = index_entries(entries);
    let mut summary = MergeSummary::default();

    for record in document.records_mut() {
        let Some(pending) = index
            .get_mut(&record.kind)
            .and_then(|ids| ids.remove(record.id.as_str()))
        else {
            continue;
        };

        let was_modified = record.is_modified();
        let mut changed = false;
        for entry in pending {
            let Some(reference) = &entry.reference else {
                continue;
            };
            let key = config.destination_key(&reference.tag);
            match record.set_tag(&key, &entry.translated_text) {
                TagChange::Unchanged => summary.unchanged_tags += 1,
                TagChange::Updated => {
                    summary.updated_tags += 1;
                    changed = true;
                }
                TagChange::Inserted => {
                    summary.inserted_tags += 1;
                    changed = true;
                }
            }
        }
        if changed && !was_modified {
            summary.modified_records += 1;
        }
    }

    for (kind, ids) in &index {
        for (id, pending) in ids {
            debug!(
                kind = %kind,
                id = *id,
                entries = pending.len(),
                "dropping entries for missing record"
            );
            summary.dangling_entries += pending.len();
        }
    }

    summary
}

/// Merges `entries` into `document` and returns the updated document.
pub fn merge(mut document: Document, entries: &[CatalogEntry], config: &ImportConfig) -> Document {
    merge_into(&mut document, entries, config);
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::po::{self, EntryReference};
    use indoc::indoc;

    const DOCUMENT: &str = indoc! {r#"
        <osm>
          <node id="1">
            <tag k="name" v="Minsk"/>
            <tag k="name:de" v="Minsk"/>
          </node>
          <way id="2">
            <tag k="highway" v="primary"/>
            <tag k="name" v="Main St"/>
          </way>
        </osm>
    "#};

    fn entry(kind: RecordKind, id: &str, tag: &str, msgstr: &str) -> CatalogEntry {
        CatalogEntry {
            reference: Some(EntryReference::new(kind, id, tag)),
            translated_text: msgstr.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_then_idempotent() {
        let entries = vec![entry(RecordKind::Way, "2", "name", "Hauptstraße")];
        let config = ImportConfig::new("de");

        let mut document = Document::parse(DOCUMENT).unwrap();
        let first = merge_into(&mut document, &entries, &config);
        assert_eq!(first.inserted_tags, 1);
        assert_eq!(first.modified_records, 1);
        let way = document.find(RecordKind::Way, "2").unwrap();
        assert_eq!(way.tag("name:de"), Some("Hauptstraße"));
        assert!(way.is_modified());
        let once = document.to_xml();

        let second = merge_into(&mut document, &entries, &config);
        assert_eq!(second.modified_records, 0);
        assert_eq!(second.inserted_tags, 0);
        assert_eq!(second.unchanged_tags, 1);
        assert_eq!(document.to_xml(), once);
    }

    #[test]
    fn test_identical_translation_leaves_record_untouched() {
        let entries = vec![entry(RecordKind::Node, "1", "name", "Minsk")];
        let document = merge(
            Document::parse(DOCUMENT).unwrap(),
            &entries,
            &ImportConfig::new("de"),
        );
        assert!(!document.is_modified());
        assert_eq!(document.to_xml(), DOCUMENT);
    }

    #[test]
    fn test_changed_translation_is_updated() {
        let entries = vec![entry(RecordKind::Node, "1", "name", "Minsk (Hauptstadt)")];
        let mut document = Document::parse(DOCUMENT).unwrap();
        let summary = merge_into(&mut document, &entries, &ImportConfig::new("de"));
        assert_eq!(summary.updated_tags, 1);
        assert_eq!(summary.modified_records, 1);
        assert_eq!(
            document.to_xml(),
            DOCUMENT
                .replace(r#"<node id="1">"#, r#"<node id="1" action="modify">"#)
                .replace(
                    r#"<tag k="name:de" v="Minsk"/>"#,
                    r#"<tag k="name:de" v="Minsk (Hauptstadt)"/>"#,
                )
        );
    }

    #[test]
    fn test_empty_translation_creates_nothing() {
        let entries = vec![entry(RecordKind::Way, "2", "name", "")];
        let mut document = Document::parse(DOCUMENT).unwrap();
        let summary = merge_into(&mut document, &entries, &ImportConfig::new("de"));
        assert_eq!(summary, MergeSummary::default());
        let way = document.find(RecordKind::Way, "2").unwrap();
        assert!(way.tag("name:de").is_none());
    }

    #[test]
    fn test_dangling_reference_is_dropped() {
        let entries = vec![
            entry(RecordKind::Node, "99999", "name", "Nirgendwo"),
            entry(RecordKind::Relation, "2", "name", "Falscher Typ"),
        ];
        let mut document = Document::parse(DOCUMENT).unwrap();
        let summary = merge_into(&mut document, &entries, &ImportConfig::new("de"));
        assert_eq!(summary.dangling_entries, 2);
        assert!(!document.is_modified());
        assert_eq!(document.to_xml(), DOCUMENT);
    }

    #[test]
    fn test_repeated_reference_last_entry_wins() {
        let entries = vec![
            entry(RecordKind::Way, "2", "name", "Hauptstraße"),
            entry(RecordKind::Way, "2", "highway", "Bundesstraße"),
            entry(RecordKind::Way, "2", "name", "Hauptstr."),
        ];
        let config = ImportConfig::new("de");

        let mut document = Document::parse(DOCUMENT).unwrap();
        let first = merge_into(&mut document, &entries, &config);
        assert_eq!(first.inserted_tags, 2);
        assert_eq!(first.updated_tags, 0);
        let way = document.find(RecordKind::Way, "2").unwrap();
        assert_eq!(way.tag("name:de"), Some("Hauptstr."));

        let mut reparsed = Document::parse(document.to_xml()).unwrap();
        let second = merge_into(&mut reparsed, &entries, &config);
        assert_eq!(
            second,
            MergeSummary {
                unchanged_tags: 2,
                ..Default::default()
            }
        );
        assert!(!reparsed.is_modified());
        assert_eq!(reparsed.to_xml(), document.to_xml());
    }

    #[test]
    fn test_several_tags_of_one_record() {
        let catalog = indoc! {r#"

            #: way:2:name
            msgid "Main St"
            msgstr "Hauptstraße"

            #: way:2:highway
            msgid "primary"
            msgstr "Bundesstraße"
        "#};
        let entries = po::parse(catalog);
        let mut document = Document::parse(DOCUMENT).unwrap();
        let summary = merge_into(&mut document, &entries, &ImportConfig::new("de"));
        assert_eq!(summary.inserted_tags, 2);
        assert_eq!(summary.modified_records, 1);

        let xml = document.to_xml();
        assert!(xml.contains(concat!(
            "  <way id=\"2\" action=\"modify\">\n",
            "    <tag k=\"highway\" v=\"primary\"/>\n",
            "    <tag k=\"name\" v=\"Main St\"/>\n",
            "    <tag k=\"name:de\" v=\"Hauptstraße\"/>\n",
            "    <tag k=\"highway:de\" v=\"Bundesstraße\"/>\n",
            "  </way>\n",
        )));
    }
}
