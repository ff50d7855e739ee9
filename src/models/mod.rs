pub mod error;
pub mod history;
pub mod news;
pub mod stock;

use chrono::NaiveDateTime;
use serde_json::Value;

/// ISO-8601 text for a set timestamp, JSON `null` otherwise.
pub fn iso_or_null(value: Option<NaiveDateTime>) -> Value {
    match value {
        Some(ts) => Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        None => Value::Null,
    }
}

/// Returns at most `max` characters of `text`, never splitting a code point.
pub fn char_prefix(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
