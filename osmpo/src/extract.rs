//! Export path: records in, catalog text out.

use crate::{
    entities,
    formats::{
        osm::Document,
        po::{CatalogEntry, EntryReference},
    },
    rules::RuleSet,
    types::Record,
};

/// Settings for one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Language code whose `<key>:<language>` tags fill `msgstr`.
    pub language: String,
}

impl ExportConfig {
    pub fn new(language: impl Into<String>) -> Self {
        ExportConfig {
            language: language.into(),
        }
    }
}

/// Turns records into catalog entries according to a rule set.
#[derive(Debug, Clone)]
pub struct Extractor<'a> {
    rules: &'a RuleSet,
    config: ExportConfig,
}

impl<'a> Extractor<'a> {
    pub fn new(rules: &'a RuleSet, config: ExportConfig) -> Self {
        Extractor { rules, config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// One entry per matched key the record actually carries, in match order.
    pub fn entries(&self, record: &Record) -> Vec<CatalogEntry> {
        if !record.is_tagged() {
            return Vec::new();
        }

        let comments: Vec<String> = record.tags().map(|(k, v)| format!("{k}={v}")).collect();

        self.rules
            .match_record(record)
            .into_iter()
            .filter_map(|key| {
                let source = record.tag(&key)?;
                let translated = record
                    .tag(&format!("{}:{}", key, self.config.language))
                    .map(|value| entities::decode(value).into_owned())
                    .unwrap_or_default();
                Some(CatalogEntry {
                    comments: comments.clone(),
                    source_text: entities::decode(source).into_owned(),
                    translated_text: translated,
                    reference: Some(EntryReference::new(record.kind, record.id.clone(), key)),
                })
            })
            .collect()
    }

    /// Catalog text for one record; empty when nothing matched.
    pub fn extract(&self, record: &Record) -> String {
        self.entries(record)
            .iter()
            .map(CatalogEntry::to_string)
            .collect()
    }

    /// Catalog text for every record of `document`, in document order.
    pub fn extract_document(&self, document: &Document) -> String {
        document
            .records()
            .iter()
            .map(|record| self.extract(record))
            .collect()
    }
}
