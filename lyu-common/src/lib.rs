//! # LyricUser Common Library
//!
//! Lyrics file handling shared by the LyricUser tools:
//! - The file schema and the in-memory document type
//! - Strict reading with early stop, and typed value conversion
//! - Brute-force recovery of damaged files
//! - Canonical UTF-16 writing
//! - Verify-then-swap repair ("tidy")
//! - Editing facade, library tree scanning, configuration

pub mod config;
pub mod convert;
mod decode;
pub mod document;
pub mod error;
pub mod library;
pub mod presenter;
pub mod reader;
pub mod recovery;
pub mod schema;
pub mod tidy;
pub mod writer;

pub use document::LyricsDocument;
pub use error::{Error, Result};
pub use presenter::LyricsPresenter;
pub use reader::LyricsFileReader;
pub use tidy::TidyOutcome;
