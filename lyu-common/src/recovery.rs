//! Brute-force field recovery
//!
//! Used when the strict reader rejects a file: bare ampersands, HTML entities
//! such as `&nbsp;`, stray control characters. Instead of parsing markup this
//! searches for the literal `<name>` and `</name>` tags of each recognized
//! field and takes the text between them verbatim.
//!
//! The raw bytes are first decoded with the legacy code page the format was
//! historically saved in. A byte order mark still wins over the code page.
//! If decoding produces U+FFFD the text is garbled and recovery stops rather
//! than rescuing nonsense.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use encoding_rs::{Encoding, WINDOWS_1252};
use tracing::debug;

use crate::document::LyricsDocument;
use crate::schema;
use crate::{Error, Result};

const REPLACEMENT_CHARACTER: char = '\u{FFFD}';

/// Code pages tried, in order, when decoding a damaged file
fn candidate_encodings() -> [&'static Encoding; 1] {
    [WINDOWS_1252]
}

/// Recover what fields can be found in the file at `path`
pub fn recover_file(path: impl AsRef<Path>) -> Result<LyricsDocument> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;

    let text = sniff_decode(&bytes).map_err(|encoding| Error::EncodingDetection {
        path: path.to_path_buf(),
        encoding,
    })?;

    let doc = recover_fields(&text)?;
    debug!(
        "Recovered {} field(s) from {} by tag search",
        doc.len(),
        path.display()
    );
    Ok(doc)
}

/// Extract recognized fields from `text` by literal tag search.
///
/// A field with no open tag is left out. A second open tag before the close
/// tag, or no close tag at all, fails the whole recovery.
pub fn recover_fields(text: &str) -> Result<LyricsDocument> {
    let mut doc = LyricsDocument::new();

    for field in schema::FIELDS {
        if let Some(value) = extract_field(text, field)? {
            doc.insert(field, value);
        }
    }

    Ok(doc)
}

fn extract_field<'a>(text: &'a str, field: &str) -> Result<Option<&'a str>> {
    let open_tag = format!("<{}>", field);
    let close_tag = format!("</{}>", field);

    let start = match text.find(&open_tag) {
        Some(index) => index + open_tag.len(),
        None => return Ok(None),
    };

    let rest = &text[start..];
    let value = match rest.find(&close_tag) {
        Some(end) => &rest[..end],
        None => {
            return Err(Error::UnterminatedField {
                field: field.to_string(),
            })
        }
    };

    if value.contains(&open_tag) {
        return Err(Error::DuplicateField {
            field: field.to_string(),
        });
    }

    Ok(Some(value))
}

/// Decode with the first candidate that yields no replacement characters.
///
/// On failure returns the name of the last encoding tried.
fn sniff_decode(bytes: &[u8]) -> std::result::Result<Cow<'_, str>, &'static str> {
    let mut last_tried = WINDOWS_1252.name();

    for encoding in candidate_encodings() {
        let (text, used, _) = encoding.decode(bytes);
        if !text.contains(REPLACEMENT_CHARACTER) {
            return Ok(text);
        }
        debug!("Decoding as {} produced replacement characters", used.name());
        last_tried = used.name();
    }

    Err(last_tried)
}
