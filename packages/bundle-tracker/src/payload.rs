//! Tolerant navigation over dynamically shaped payload trees.
//!
//! Bundle payloads are deeply nested with resource-specific key paths.
//! Lookups default silently instead of raising so that a missing or
//! reshaped node reads as "nothing there", never a crash.

use serde_json::Value;

static NULL: Value = Value::Null;

/// Walk `path` through nested objects, returning `Null` on the first
/// miss (absent key or non-object intermediate).
pub fn dig<'a>(value: &'a Value, path: &[String]) -> &'a Value {
    let mut current = value;
    for key in path {
        current = match current.get(key) {
            Some(next) => next,
            None => return &NULL,
        };
    }
    current
}

/// The record array at `path`, or an empty slice when the path or the
/// array itself is absent.
pub fn records_at<'a>(value: &'a Value, path: &[String]) -> &'a [Value] {
    match dig(value, path).as_array() {
        Some(items) => items.as_slice(),
        None => &[],
    }
}
