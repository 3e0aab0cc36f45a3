//! Editing facade over one lyrics file
//!
//! Splits a document into the lyrics body and its metadata for display, and
//! tracks whether anything was actually changed so the editor knows when a
//! save is needed.

use std::path::{Path, PathBuf};

use crate::document::LyricsDocument;
use crate::reader::LyricsFileReader;
use crate::schema::LYRICS;
use crate::{writer, Error, Result};

#[derive(Debug, Clone)]
pub struct LyricsPresenter {
    path: PathBuf,
    document: LyricsDocument,
    modified: bool,
}

impl LyricsPresenter {
    /// Load the document behind `reader`; it must have a `lyrics` field
    pub fn new(reader: &mut LyricsFileReader) -> Result<Self> {
        let document = reader.read_all()?.clone();

        if !document.contains(LYRICS) {
            return Err(Error::KeyNotFound {
                path: reader.path().to_path_buf(),
                key: LYRICS.to_string(),
            });
        }

        Ok(Self {
            path: reader.path().to_path_buf(),
            document,
            modified: false,
        })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(&mut LyricsFileReader::new(path)?)
    }

    /// Path the document was loaded from
    pub fn file_path(&self) -> &Path {
        &self.path
    }

    pub fn lyrics(&self) -> &str {
        self.document.lyrics().unwrap_or_default()
    }

    pub fn set_lyrics(&mut self, lyrics: impl Into<String>) {
        self.set_field(LYRICS.to_string(), lyrics.into());
    }

    /// Every field except the lyrics, in document order
    pub fn metadata(&self) -> impl Iterator<Item = (&str, &str)> {
        self.document.metadata()
    }

    pub fn metadata_value(&self, name: &str) -> Option<&str> {
        if name == LYRICS {
            return None;
        }
        self.document.get(name)
    }

    /// Set a metadata field, adding it when absent
    pub fn set_metadata(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.is_empty() || name == LYRICS {
            return Err(Error::InvalidArgument(format!(
                "'{}' is not a metadata field name",
                name
            )));
        }
        self.set_field(name, value.into());
        Ok(())
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn to_document(&self) -> LyricsDocument {
        self.document.clone()
    }

    /// Write the current state back to the file it was loaded from
    pub fn save(&mut self) -> Result<()> {
        writer::write_to_file(&self.path, &self.document)?;
        self.modified = false;
        Ok(())
    }

    fn set_field(&mut self, name: String, value: String) {
        if self.document.get(&name) != Some(value.as_str()) {
            self.document.insert(name, value);
            self.modified = true;
        }
    }
}
