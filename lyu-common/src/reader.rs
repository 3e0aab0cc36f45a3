//! Strict reader for lyrics files
//!
//! A lyrics file is a flat `<document>` of leaf elements, one per field.
//! The reader pulls events from `quick-xml` and records `name -> text` for
//! every element after the `document` start tag. Reading can stop as soon as
//! a given field has been closed, so answering "is this a favourite" for a
//! large library never reads, decodes or tokenizes the lyrics body that
//! follows. Files are decoded incrementally by [`crate::decode`].
//!
//! Any markup error surfaces as [`Error::MalformedDocument`] carrying the
//! parser diagnostic; the reader never guesses. Repair is the job of
//! [`crate::tidy`].

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::convert::{convert, FieldValue};
use crate::decode;
use crate::document::LyricsDocument;
use crate::schema::DOCUMENT_ELEMENT;
use crate::{Error, Result};

/// Reader bound to one lyrics file.
///
/// Nothing is read on construction. [`read_all`](Self::read_all) caches its
/// result on the instance; call [`invalidate`](Self::invalidate) after the
/// file has been rewritten.
#[derive(Debug, Clone)]
pub struct LyricsFileReader {
    path: PathBuf,
    cache: Option<LyricsDocument>,
}

impl LyricsFileReader {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidArgument(
                "lyrics file path must not be empty".to_string(),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            cache: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the whole document
    pub fn read_all(&mut self) -> Result<&LyricsDocument> {
        let doc = match self.cache.take() {
            Some(doc) => doc,
            None => parse_file(&self.path, |_| false)?,
        };
        let doc: &LyricsDocument = self.cache.insert(doc);
        Ok(doc)
    }

    /// Parse until `key` has been read or the input ends.
    ///
    /// The result holds every field seen up to and including `key`.
    pub fn read_until(&self, key: &str) -> Result<LyricsDocument> {
        require_key(key)?;

        if let Some(doc) = &self.cache {
            return Ok(doc.clone());
        }

        parse_file(&self.path, |name| name == key)
    }

    /// Read and convert one value; absence is an error
    pub fn read_value<T: FieldValue>(&self, key: &str) -> Result<T> {
        self.try_read_value(key)?.ok_or_else(|| Error::KeyNotFound {
            path: self.path.clone(),
            key: key.to_string(),
        })
    }

    /// Read and convert one value; absence is `Ok(None)`
    pub fn try_read_value<T: FieldValue>(&self, key: &str) -> Result<Option<T>> {
        let doc = self.read_until(key)?;
        doc.get(key).map(|raw| convert(key, raw)).transpose()
    }

    /// Drop the cached document
    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}

/// Parse the whole document at `path`
pub fn read_all(path: impl AsRef<Path>) -> Result<LyricsDocument> {
    let mut reader = LyricsFileReader::new(path)?;
    reader.read_all()?;
    Ok(reader.cache.take().unwrap_or_default())
}

/// Parse the document at `path` until `key` has been read
pub fn read_until(path: impl AsRef<Path>, key: &str) -> Result<LyricsDocument> {
    LyricsFileReader::new(path)?.read_until(key)
}

/// Read and convert the value of `key` in the document at `path`
pub fn read_value<T: FieldValue>(path: impl AsRef<Path>, key: &str) -> Result<T> {
    LyricsFileReader::new(path)?.read_value(key)
}

/// Like [`read_value`], but an absent key is `Ok(None)`
pub fn try_read_value<T: FieldValue>(path: impl AsRef<Path>, key: &str) -> Result<Option<T>> {
    LyricsFileReader::new(path)?.try_read_value(key)
}

/// Parse a document held in memory
pub fn parse_str(source: &str) -> std::result::Result<LyricsDocument, String> {
    traverse(source.as_bytes(), |_| false)
}

fn require_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidArgument("key must not be empty".to_string()));
    }
    Ok(())
}

fn parse_file<F>(path: &Path, stop_after: F) -> Result<LyricsDocument>
where
    F: FnMut(&str) -> bool,
{
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let source = decode::transcode(BufReader::new(file)).map_err(|e| Error::io(path, e))?;
    debug!("Reading {} as {}", path.display(), source.encoding().name());

    let doc = traverse(BufReader::new(source), stop_after).map_err(|message| {
        Error::MalformedDocument {
            path: path.to_path_buf(),
            message,
        }
    })?;

    debug!("Read {} field(s) from {}", doc.len(), path.display());
    Ok(doc)
}

/// Field whose start tag has been read but not yet its end tag
struct OpenField {
    name: String,
    text: String,
}

/// Walk the document node by node, recording fields until `stop_after`
/// accepts a just-closed field name or the input ends.
fn traverse<R, F>(source: R, mut stop_after: F) -> std::result::Result<LyricsDocument, String>
where
    R: BufRead,
    F: FnMut(&str) -> bool,
{
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();
    let mut doc = LyricsDocument::new();
    let mut open: Option<OpenField> = None;
    let mut depth: usize = 0;
    let mut top_level_elements: usize = 0;
    let mut in_document = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| diagnostic(&reader, e))?;

        match event {
            // Everything before the document start tag is skipped
            Event::Start(e) if !in_document => {
                let name = element_name(&reader, e.name().as_ref())?;
                enter_top_level(depth, &mut top_level_elements, &reader)?;
                depth += 1;
                in_document = name == DOCUMENT_ELEMENT;
            }
            Event::Empty(e) if !in_document => {
                element_name(&reader, e.name().as_ref())?;
                enter_top_level(depth, &mut top_level_elements, &reader)?;
            }
            Event::Start(e) => {
                let name = element_name(&reader, e.name().as_ref())?;
                enter_top_level(depth, &mut top_level_elements, &reader)?;
                depth += 1;

                // A nested element closes off the enclosing field at this point
                if let Some(field) = open.take() {
                    if commit(&mut doc, field, &mut stop_after) {
                        return Ok(doc);
                    }
                }
                open = Some(OpenField {
                    name,
                    text: String::new(),
                });
            }
            Event::Empty(e) => {
                let name = element_name(&reader, e.name().as_ref())?;
                enter_top_level(depth, &mut top_level_elements, &reader)?;

                if let Some(field) = open.take() {
                    if commit(&mut doc, field, &mut stop_after) {
                        return Ok(doc);
                    }
                }
                let field = OpenField {
                    name,
                    text: String::new(),
                };
                if commit(&mut doc, field, &mut stop_after) {
                    return Ok(doc);
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if let Some(field) = open.take() {
                    if commit(&mut doc, field, &mut stop_after) {
                        return Ok(doc);
                    }
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| diagnostic(&reader, e))?;
                if depth == 0 && !text.trim().is_empty() {
                    return Err(format!(
                        "data at the root level is invalid (at byte {})",
                        reader.buffer_position()
                    ));
                }
                if let Some(field) = open.as_mut() {
                    field.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                let raw = c.into_inner();
                let text = reader
                    .decoder()
                    .decode(&raw)
                    .map_err(|e| diagnostic(&reader, e))?;
                if let Some(field) = open.as_mut() {
                    field.text.push_str(&text);
                }
            }
            Event::Eof => {
                if depth > 0 {
                    return Err(format!(
                        "unexpected end of input with {} element(s) still open",
                        depth
                    ));
                }
                return Ok(doc);
            }
            _ => {}
        }
        buf.clear();
    }
}

/// Reject a second top-level element
fn enter_top_level<R>(
    depth: usize,
    top_level_elements: &mut usize,
    reader: &Reader<R>,
) -> std::result::Result<(), String> {
    if depth == 0 {
        *top_level_elements += 1;
        if *top_level_elements > 1 {
            return Err(format!(
                "multiple root elements (at byte {})",
                reader.buffer_position()
            ));
        }
    }
    Ok(())
}

fn element_name<R>(reader: &Reader<R>, raw: &[u8]) -> std::result::Result<String, String> {
    reader
        .decoder()
        .decode(raw)
        .map(Cow::into_owned)
        .map_err(|e| diagnostic(reader, e))
}

/// Record a finished field; true when reading should stop here
fn commit<F>(doc: &mut LyricsDocument, field: OpenField, stop_after: &mut F) -> bool
where
    F: FnMut(&str) -> bool,
{
    let stop = stop_after(&field.name);
    doc.insert(field.name, field.text);
    stop
}

fn diagnostic<R>(reader: &Reader<R>, err: impl std::fmt::Display) -> String {
    format!("{} (at byte {})", err, reader.buffer_position())
}
