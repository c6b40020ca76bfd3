//! All error types for the osmpo crate.
//!
//! Only problems that make a run meaningless are errors: unreadable input,
//! broken XML, unusable rule configuration. Anomalies inside otherwise valid
//! input (unresolved entity references, odd catalog lines, catalog entries
//! pointing at records that no longer exist) are logged and skipped instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rule configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("invalid rule: {0}")]
    InvalidRule(String),

    #[error("unknown record type `{0}`")]
    UnknownRecordKind(String),

    #[error("invalid entry reference `{0}`")]
    InvalidReference(String),
}

impl Error {
    /// Creates a new invalid rule error
    pub fn invalid_rule(message: impl Into<String>) -> Self {
        Error::InvalidRule(message.into())
    }

    /// Returns `true` for errors raised while loading rule definitions.
    ///
    /// These are reported before any record is processed.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_) | Error::InvalidRule(_))
    }
}
