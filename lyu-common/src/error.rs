//! Common error types for lyrics file handling
//!
//! One enum covers every failure the core can report. Callers branch on the
//! variant rather than on where the failure came from: a batch scan swallows
//! [`Error::KeyNotFound`] and [`Error::Conversion`] as "no match", hands
//! [`Error::MalformedDocument`] to the tidy protocol, and propagates the rest.

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for lyrics operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the lyrics core
#[derive(Error, Debug)]
pub enum Error {
    /// Required input was empty
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File system failure (missing file, permission denied, ...)
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Strict parse failed; the message is the parser diagnostic
    #[error("Malformed lyrics document {path}: {message}")]
    MalformedDocument { path: PathBuf, message: String },

    /// Key absent after a full scan of the document
    #[error("Key '{key}' not found in {path}")]
    KeyNotFound { path: PathBuf, key: String },

    /// Value present but not convertible to the requested type
    #[error("Cannot convert field '{field}' value '{raw}' to {target}")]
    Conversion {
        field: String,
        raw: String,
        target: &'static str,
    },

    /// Brute-force scan found a second open tag before the close tag
    #[error("Field '{field}' opens twice before it closes")]
    DuplicateField { field: String },

    /// Brute-force scan found an open tag with no close tag
    #[error("Field '{field}' is never closed")]
    UnterminatedField { field: String },

    /// Raw bytes did not decode cleanly with any candidate encoding
    #[error("Could not decode {path} as {encoding}")]
    EncodingDetection {
        path: PathBuf,
        encoding: &'static str,
    },

    /// Writing a document to disk failed
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single field could not be serialized
    #[error("Cannot write field '{field}' (value '{value}'): {reason}")]
    FieldWrite {
        field: String,
        value: String,
        reason: String,
    },

    /// Document-level serialization failure
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Tidy could not produce a document that parses
    #[error("Unrecoverable lyrics document {path}: {source}")]
    Unrecoverable {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// Configuration loading or saving error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the file is broken in a way the tidy protocol can attempt to repair
    pub fn needs_repair(&self) -> bool {
        matches!(self, Error::MalformedDocument { .. })
    }

    /// True when the document is fine but the requested value is missing or unusable.
    ///
    /// Best-effort display code treats these as "not set".
    pub fn is_missing_value(&self) -> bool {
        matches!(self, Error::KeyNotFound { .. } | Error::Conversion { .. })
    }
}
