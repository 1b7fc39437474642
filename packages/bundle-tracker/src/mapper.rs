//! Declarative projection of cryptically-keyed raw records onto
//! semantic field names.

use serde_json::{Map, Value};

use crate::types::{FieldMapping, NormalizedRecord};

/// Project `raw` through `mapping`.
///
/// Source keys absent from the raw record are omitted from the output
/// rather than filled with a default; raw keys outside the mapping are
/// dropped. This tolerance is intentional: resources routinely gain
/// and lose optional columns between bundle versions. A record with no
/// matching keys yields an empty output and it is the caller's call
/// whether to keep it.
pub fn map_record(raw: &Map<String, Value>, mapping: &FieldMapping) -> NormalizedRecord {
    let mut record = NormalizedRecord::default();

    for column in &mapping.columns {
        if let Some(value) = raw.get(&column.source) {
            record.insert(column.semantic.clone(), stringify(value));
        }
    }

    record
}

/// Identity values are compared as strings across runs, so every
/// scalar is stringified here. Null becomes the empty string.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
