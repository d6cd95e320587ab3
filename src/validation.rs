//! Input normalization and field checks shared by users and tokens.

use serde_json::{Map, Value};

use crate::storage::is_valid_key;

pub const PHONE_LENGTH: usize = 10;

/// Trim leading/trailing whitespace from every string field of an object.
///
/// Non-string fields pass through unchanged; a non-object value becomes an
/// empty object.
pub fn normalize(payload: Value) -> Map<String, Value> {
    match payload {
        Value::Object(fields) => fields
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => (key, Value::String(s.trim().to_string())),
                other => (key, other),
            })
            .collect(),
        _ => Map::new(),
    }
}

/// Exactly `len` characters (not bytes).
pub fn has_length(value: &str, len: usize) -> bool {
    value.chars().count() == len
}

/// Exactly ten characters, none of which could leave the `users` directory
/// when the phone is used as a record key.
pub fn is_valid_phone(phone: &str) -> bool {
    has_length(phone, PHONE_LENGTH) && is_valid_key(phone)
}

/// Read an optional string field; absent, null, or empty yields `None`.
pub fn non_empty_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
