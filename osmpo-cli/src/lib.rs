//! CLI library for testing purposes

pub mod export;
pub mod import;
pub mod logging;
pub mod validation;

pub use export::{DEFAULT_RULES, load_rules, run_export_command};
pub use import::run_import_command;
