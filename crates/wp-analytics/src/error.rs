//! Error types for the analytics engine
//!
//! Provides error handling for:
//! - Malformed test requests (missing test id, rows, or mapping entries)
//! - Catalogue mismatches (test id with no registered rule)
//! - Configuration loading
//!
//! Per-row parse failures are not errors: a cell that does not parse as the
//! rule expects simply never produces an exception.

use std::path::PathBuf;

/// Message shown to users for any failure caused by the column mapping
pub const MAPPING_HINT: &str = "check your column mapping and try again";

/// Errors raised by the test execution engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Request is missing a field or carries a malformed one
    #[error("invalid request: {0}")]
    Validation(String),

    /// No rule registered under the requested test id
    #[error("unknown test id: {0}")]
    UnknownRule(String),

    /// Required field has no column assigned
    #[error("field '{0}' is not mapped to a column")]
    UnmappedField(String),

    /// Mapped column does not exist in the dataset
    #[error("field '{field}' mapped to column {index}, but the dataset has {width} columns")]
    ColumnOutOfRange {
        /// Field name
        field: String,
        /// Mapped column index
        index: usize,
        /// Number of header columns
        width: usize,
    },
}

impl EngineError {
    /// Check if the error is a catalogue/configuration mismatch
    #[inline]
    #[must_use]
    pub fn is_catalogue_error(&self) -> bool {
        matches!(self, Self::UnknownRule(_))
    }

    /// Message safe to show to the person running the test
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::UnknownRule(id) => format!("unknown test '{id}'"),
            Self::UnmappedField(field) => format!("'{field}' is not mapped; {MAPPING_HINT}"),
            Self::ColumnOutOfRange { .. } => MAPPING_HINT.to_string(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading a config file
    #[error("io error reading {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or shape error
    #[error("invalid toml config: {0}")]
    InvalidToml(#[from] toml::de::Error),

    /// YAML syntax or shape error
    #[error("invalid yaml config: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    /// Unrecognised file extension
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
}
