//! Writes lyrics documents in the canonical on-disk shape
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-16"?>
//! <document>
//!   <title>A Simple Song</title>
//!   <lyrics>line one&#13;&#10;line two</lyrics>
//! </document>
//! ```
//!
//! Elements follow the iteration order of the document. Files are UTF-16LE
//! with a byte order mark. The whole document is serialized in memory before
//! the target file is opened, so a field that cannot be written never
//! truncates an existing file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::debug;

use crate::document::LyricsDocument;
use crate::schema::DOCUMENT_ELEMENT;
use crate::{Error, Result};

const INDENT_WIDTH: usize = 2;
const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];

/// Serialize `doc` to XML text
pub fn write_to_string(doc: &LyricsDocument) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_WIDTH);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-16"), None)))
        .map_err(serialize_error)?;
    writer
        .write_event(Event::Start(BytesStart::new(DOCUMENT_ELEMENT)))
        .map_err(serialize_error)?;

    for (name, value) in doc.iter() {
        write_field(&mut writer, name, value)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(DOCUMENT_ELEMENT)))
        .map_err(serialize_error)?;

    String::from_utf8(writer.into_inner()).map_err(|e| Error::Serialize(e.to_string()))
}

/// Serialize `doc` and write it to `path`, replacing any previous content
pub fn write_to_file(path: impl AsRef<Path>, doc: &LyricsDocument) -> Result<()> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidArgument(
            "lyrics file path must not be empty".to_string(),
        ));
    }

    let bytes = encode_utf16le(&write_to_string(doc)?);

    let write_error = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    // Explicit truncate: a shorter document must not leave stale trailing bytes
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(write_error)?;
    file.write_all(&bytes).map_err(write_error)?;
    file.sync_all().map_err(write_error)?;

    debug!("Wrote {} field(s) to {}", doc.len(), path.display());
    Ok(())
}

fn write_field(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> Result<()> {
    let field_error = |reason: String| Error::FieldWrite {
        field: name.to_string(),
        value: value.to_string(),
        reason,
    };

    check_name(name).map_err(field_error)?;
    check_characters(value).map_err(field_error)?;

    write_element(writer, name, &escape_text(value)).map_err(|e| field_error(e.to_string()))
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    escaped: &str,
) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::from_escaped(escaped)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Escape markup characters; line breaks become character references so the
/// text survives end-of-line normalization
fn escape_text(value: &str) -> String {
    partial_escape(value)
        .replace('\r', "&#13;")
        .replace('\n', "&#10;")
}

fn check_name(name: &str) -> std::result::Result<(), String> {
    let mut chars = name.chars();
    let first = chars
        .next()
        .ok_or_else(|| "element name is empty".to_string())?;

    if !(first.is_alphabetic() || first == '_' || first == ':') {
        return Err(format!("'{}' cannot start an element name", first));
    }
    if let Some(bad) = chars.find(|c: &char| !(c.is_alphanumeric() || matches!(*c, '-' | '.' | '_' | ':'))) {
        return Err(format!("'{}' is not allowed in an element name", bad));
    }
    Ok(())
}

fn check_characters(value: &str) -> std::result::Result<(), String> {
    match value.chars().find(|c| !is_xml_char(*c)) {
        Some(bad) => Err(format!("character U+{:04X} is not allowed in XML", bad as u32)),
        None => Ok(()),
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

fn encode_utf16le(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(UTF16LE_BOM.len() + text.len() * 2);
    bytes.extend_from_slice(&UTF16LE_BOM);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

fn serialize_error(err: quick_xml::Error) -> Error {
    Error::Serialize(err.to_string())
}
