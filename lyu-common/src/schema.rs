//! Element names of the lyrics file format

/// Root container element
pub const DOCUMENT_ELEMENT: &str = "document";

pub const ARTIST: &str = "artist";
pub const TITLE: &str = "title";
pub const CAPO: &str = "capo";
pub const KEY: &str = "key";
pub const FAVOURITE: &str = "favourite";
pub const SINGABLE: &str = "singable";
pub const TAGS: &str = "tags";
pub const LYRICS: &str = "lyrics";

/// Recognized fields in editor display order
pub const FIELDS: [&str; 8] = [ARTIST, TITLE, CAPO, KEY, FAVOURITE, SINGABLE, TAGS, LYRICS];

/// Whether `name` is one of the recognized fields
pub fn is_recognized(name: &str) -> bool {
    FIELDS.contains(&name)
}

/// Display position of a field; unrecognized names sort after all recognized ones
pub fn display_rank(name: &str) -> usize {
    FIELDS
        .iter()
        .position(|field| *field == name)
        .unwrap_or(FIELDS.len())
}
