//! The two file formats osmpo reads and writes.
//!
//! - [`osm`]: OSM XML documents, the source of records and the merge target.
//! - [`po`]: gettext PO catalogs, produced on export and consumed on import.

pub mod osm;
pub mod po;

pub use osm::Document;
pub use po::{Catalog, CatalogEntry, EntryReference};
