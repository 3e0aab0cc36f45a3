//! The in-memory form of one lyrics file

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::schema;

/// Field name to field value mapping.
///
/// Iteration follows insertion order, which the writer uses as element order.
/// Equality ignores order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LyricsDocument {
    fields: IndexMap<String, String>,
}

impl LyricsDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Set a field, keeping its position if it already exists.
    ///
    /// Returns the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fields.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn lyrics(&self) -> Option<&str> {
        self.get(schema::LYRICS)
    }

    /// Every field except the lyrics body
    pub fn metadata(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(name, _)| *name != schema::LYRICS)
    }

    /// A copy with recognized fields in display order, unrecognized fields after
    /// them in their original order
    pub fn in_display_order(&self) -> LyricsDocument {
        let mut fields = self.fields.clone();
        fields.sort_by(|a, _, b, _| schema::display_rank(a).cmp(&schema::display_rank(b)));
        LyricsDocument { fields }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LyricsDocument {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = LyricsDocument::new();
        for (name, value) in iter {
            doc.insert(name, value);
        }
        doc
    }
}
