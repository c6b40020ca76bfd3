#![forbid(unsafe_code)]
//! Translation catalogs for OpenStreetMap data.
//!
//! Extracts translatable tag values (names, descriptions, inscriptions) from
//! an OSM XML document into a gettext PO catalog, and merges the translated
//! catalog back as `<key>:<language>` tags.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use osmpo::{Catalog, Document, ExportConfig, Extractor, ImportConfig, RuleSet, merge_into};
//! use osmpo::traits::Parser;
//!
//! let rules = RuleSet::read_from("rules.yaml")?;
//! let mut document = Document::read_from("minsk.osm")?;
//!
//! // Export: one catalog block per translatable tag.
//! let extractor = Extractor::new(&rules, ExportConfig::new("be"));
//! std::fs::write("minsk.po", extractor.extract_document(&document))?;
//!
//! // Import: translated entries become `name:be` and friends.
//! let catalog = Catalog::read_from("minsk.po")?;
//! let summary = merge_into(&mut document, &catalog.entries, &ImportConfig::new("be"));
//! println!("{} records changed", summary.modified_records);
//! document.write_to("minsk-be.osm")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Records that were not changed by a merge are written back exactly as they
//! were read; changed ones are flagged with `action="modify"`.

pub mod entities;
pub mod error;
pub mod extract;
pub mod formats;
pub mod merge;
pub mod rules;
pub mod traits;
pub mod types;

// Re-export most used types for easy consumption
pub use crate::{
    error::Error,
    extract::{ExportConfig, Extractor},
    formats::{Catalog, CatalogEntry, Document, EntryReference},
    merge::{ImportConfig, MergeSummary, merge, merge_into},
    rules::{AppliesTo, Predicate, Rule, RuleSet},
    types::{Record, RecordKind, Tag, TagChange},
};
