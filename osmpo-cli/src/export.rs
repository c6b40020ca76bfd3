use std::io::{self, BufWriter, Write};

use osmpo::traits::Parser;
use osmpo::{Document, ExportConfig, Extractor, RuleSet};
use tracing::{info, warn};

use crate::validation::{validate_file_path, validate_language_code};

/// Rules used when `--rules` is not given.
pub const DEFAULT_RULES: &str = include_str!("../rules.yaml");

/// Loads the rule file at `path`, or the built-in rules.
pub fn load_rules(path: Option<&str>) -> Result<RuleSet, String> {
    match path {
        Some(path) => {
            validate_file_path(path)?;
            RuleSet::read_from(path).map_err(|e| format!("{}: {}", path, e))
        }
        None => RuleSet::from_yaml(DEFAULT_RULES).map_err(|e| format!("built-in rules: {}", e)),
    }
}

/// Run the export command: print a catalog for every translatable tag of
/// `input` to `out`.
pub fn run_export_command<W: Write>(
    input: &str,
    lang: &str,
    rules: Option<&str>,
    out: W,
) -> Result<(), String> {
    if let Err(e) = validate_language_code(lang) {
        warn!("{}", e);
    }
    let rules = load_rules(rules)?;

    validate_file_path(input)?;
    let document = Document::read_from(input).map_err(|e| format!("{}: {}", input, e))?;

    let extractor = Extractor::new(&rules, ExportConfig::new(lang));
    let mut out = BufWriter::new(out);
    let mut entries = 0;
    for record in document.records() {
        let record_entries = extractor.entries(record);
        entries += record_entries.len();
        for entry in &record_entries {
            write!(out, "{}", entry).map_err(|e| e.to_string())?;
        }
    }
    out.flush().map_err(|e| e.to_string())?;

    info!(
        records = document.records().len(),
        entries, "exported {}", input
    );
    Ok(())
}

/// [`run_export_command`] writing to stdout.
pub fn run_export_to_stdout(input: &str, lang: &str, rules: Option<&str>) -> Result<(), String> {
    run_export_command(input, lang, rules, io::stdout().lock())
}
