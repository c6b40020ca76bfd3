use std::io::{self, BufWriter, Write};

use osmpo::traits::Parser;
use osmpo::{Catalog, Document, ImportConfig, merge_into};
use tracing::{info, warn};

use crate::validation::{validate_file_path, validate_language_code};

/// Run the import command: merge the translations of `catalog` into
/// `input` and write the resulting document to `out`.
pub fn run_import_command<W: Write>(
    input: &str,
    catalog: &str,
    lang: &str,
    out: W,
) -> Result<(), String> {
    if let Err(e) = validate_language_code(lang) {
        warn!("{}", e);
    }
    validate_file_path(input)?;
    validate_file_path(catalog)?;

    let catalog_entries = Catalog::read_from(catalog)
        .map_err(|e| format!("{}: {}", catalog, e))?
        .entries;
    info!(entries = catalog_entries.len(), "read catalog {}", catalog);

    let mut document = Document::read_from(input).map_err(|e| format!("{}: {}", input, e))?;
    let summary = merge_into(&mut document, &catalog_entries, &ImportConfig::new(lang));
    info!(
        modified_records = summary.modified_records,
        inserted_tags = summary.inserted_tags,
        updated_tags = summary.updated_tags,
        unchanged_tags = summary.unchanged_tags,
        dangling_entries = summary.dangling_entries,
        "merged translations into {}",
        input
    );

    let mut out = BufWriter::new(out);
    document.to_writer(&mut out).map_err(|e| e.to_string())?;
    out.flush().map_err(|e| e.to_string())
}

/// [`run_import_command`] writing to stdout.
pub fn run_import_to_stdout(input: &str, catalog: &str, lang: &str) -> Result<(), String> {
    run_import_command(input, catalog, lang, io::stdout().lock())
}
