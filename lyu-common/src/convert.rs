//! Typed conversion of raw field text
//!
//! The set of target types is closed: `bool`, `i32` and `String`. Callers pick
//! the type at the call site, e.g. `read_value::<bool>(path, "favourite")`.

use crate::{Error, Result};

/// A type a raw field string can be converted into
pub trait FieldValue: Sized {
    /// Name used in conversion errors
    const TYPE_NAME: &'static str;

    /// Parse `raw`, or `None` when it is not a valid representation
    fn parse_field(raw: &str) -> Option<Self>;
}

impl FieldValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn parse_field(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("true") {
            Some(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }
}

impl FieldValue for i32 {
    const TYPE_NAME: &'static str = "integer";

    fn parse_field(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl FieldValue for String {
    const TYPE_NAME: &'static str = "string";

    fn parse_field(raw: &str) -> Option<Self> {
        Some(raw.to_owned())
    }
}

/// Convert the raw value of `field` to `T`
pub fn convert<T: FieldValue>(field: &str, raw: &str) -> Result<T> {
    T::parse_field(raw).ok_or_else(|| Error::Conversion {
        field: field.to_owned(),
        raw: raw.to_owned(),
        target: T::TYPE_NAME,
    })
}
