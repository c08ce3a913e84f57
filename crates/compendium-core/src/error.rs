//! Error types for compendium-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in compendium-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed XML document
    #[error("failed to parse XML '{path}': {message}")]
    XmlParse { path: PathBuf, message: String },

    /// Failed to serialize a document
    #[error("failed to write XML '{path}': {message}")]
    XmlWrite { path: PathBuf, message: String },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// A merge was requested with nothing to merge
    #[error("no source documents for '{0}'")]
    NoSources(String),

    /// Requested group does not exist in the scan
    #[error("no group named '{0}'")]
    GroupNotFound(String),

    /// A required directory is absent
    #[error("directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// An option value could not be understood
    #[error("invalid value '{value}' for {option}")]
    InvalidOption { option: String, value: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_option(option: &str, value: &str) -> Self {
        Error::InvalidOption {
            option: option.to_string(),
            value: value.to_string(),
        }
    }
}
