use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Version fingerprint standing in for "has this resource's remote
/// content changed".
///
/// Derived from transport metadata rather than a content hash: equal
/// `Last-Modified` + `Content-Length` pairs compare equal. A server
/// that alters either header without changing content produces a false
/// positive, and one that changes content while preserving both
/// produces a false negative. Best effort, chosen for stability
/// against implementations talking to the same server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionFingerprint(pub String);

impl VersionFingerprint {
    /// Derive a fingerprint from the `Last-Modified` and
    /// `Content-Length` header values of a metadata response.
    ///
    /// An absent header contributes the literal string "None", so the
    /// derived value stays byte-identical across implementations.
    pub fn derive(last_modified: Option<&str>, content_length: Option<&str>) -> Self {
        let modified = last_modified.unwrap_or("None");
        let length = content_length.unwrap_or("None");
        Self(format!("{}_{}", modified, length))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One column of a field mapping: a short opaque source key and the
/// semantic name it surfaces as.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldColumn {
    pub source: String,
    pub semantic: String,
    /// Free-text columns get markup stripped during normalization.
    pub free_text: bool,
}

/// Ordered list of (source key, semantic name) pairs for one resource
/// type. Order defines output column order in the persisted sink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldMapping {
    pub columns: Vec<FieldColumn>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, source: impl Into<String>, semantic: impl Into<String>) -> Self {
        self.columns.push(FieldColumn {
            source: source.into(),
            semantic: semantic.into(),
            free_text: false,
        });
        self
    }

    pub fn text_column(mut self, source: impl Into<String>, semantic: impl Into<String>) -> Self {
        self.columns.push(FieldColumn {
            source: source.into(),
            semantic: semantic.into(),
            free_text: true,
        });
        self
    }

    /// Semantic names in declaration order (the sink header row).
    pub fn semantic_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.semantic.as_str()).collect()
    }
}

/// Keep only records whose `field` value, split on commas, contains
/// `token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowFilter {
    pub field: String,
    pub token: String,
}

impl RowFilter {
    pub fn new(field: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            token: token.into(),
        }
    }

    /// A record without the field never matches.
    pub fn matches(&self, record: &NormalizedRecord) -> bool {
        match record.get(&self.field) {
            Some(value) => value.split(',').any(|t| t.trim() == self.token),
            None => false,
        }
    }
}

/// One remotely hosted configuration bundle tracked independently.
///
/// The remote file, the local archive, and the extracted payload all
/// share the resource key: `{key}.sgs` on the server, stored as
/// `{key}.zip`, extracting back to `{key}.sgs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub key: String,
    pub label: String,
    /// Nested object keys leading to the raw record array.
    pub payload_path: Vec<String>,
    pub mapping: FieldMapping,
    pub identity_field: String,
    pub display_field: String,
    pub filter: Option<RowFilter>,
}

impl ResourceDescriptor {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        payload_path: &[&str],
        mapping: FieldMapping,
        identity_field: impl Into<String>,
        display_field: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            payload_path: payload_path.iter().map(|s| s.to_string()).collect(),
            mapping,
            identity_field: identity_field.into(),
            display_field: display_field.into(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: RowFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn remote_name(&self) -> String {
        format!("{}.sgs", self.key)
    }

    pub fn archive_name(&self) -> String {
        format!("{}.zip", self.key)
    }

    pub fn payload_name(&self) -> String {
        format!("{}.sgs", self.key)
    }
}

/// Flat record keyed by semantic field names. Insertion order follows
/// the field mapping, so iteration matches sink column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub fields: IndexMap<String, String>,
}

impl NormalizedRecord {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Ordered collection of normalized records from one payload,
/// conceptually keyed by the descriptor's identity field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub records: Vec<NormalizedRecord>,
}

impl RecordSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedRecord> {
        self.records.iter()
    }
}

/// One entity that appeared since the previous run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addition {
    pub identity: String,
    pub display: String,
}

/// Detected additions for one resource, appended to the change log and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub resource_label: String,
    pub detected_at: DateTime<Utc>,
    pub additions: Vec<Addition>,
}

impl ChangeEntry {
    pub fn identities(&self) -> Vec<&str> {
        self.additions.iter().map(|a| a.identity.as_str()).collect()
    }
}

/// Aggregate outcome of one orchestrator pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub had_updates: bool,
    pub checked: usize,
    pub updated: usize,
    pub failed: usize,
    pub message: String,
}
