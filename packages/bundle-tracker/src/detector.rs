//! Addition detection between the current record set and the
//! previously persisted one.

use std::collections::HashSet;

use chrono::Utc;

use crate::sink::PreviousRecord;
use crate::types::{Addition, ChangeEntry, RecordSet};

/// Placeholder display value for entities whose display field is
/// missing or blank.
const UNNAMED: &str = "unnamed";

/// Diff `new_records` against the previous run's identity set and
/// report additions.
///
/// Returns `None` when `previous` is absent (first run for this
/// resource) or when nothing was added. Removals and modifications of
/// existing identities are out of scope by design. Identities compare
/// as strings; numeric IDs were stringified during normalization.
pub fn detect_additions(
    resource_label: &str,
    new_records: &RecordSet,
    previous: Option<&[PreviousRecord]>,
    identity_field: &str,
    display_field: &str,
) -> Option<ChangeEntry> {
    let previous = previous?;

    let known: HashSet<&str> = previous.iter().map(|r| r.identity.as_str()).collect();

    let mut additions = Vec::new();
    for record in new_records.iter() {
        let Some(identity) = record.get(identity_field) else {
            // cannot diff a record that never got its identity column
            tracing::debug!(label = resource_label, "record without identity field skipped");
            continue;
        };
        if known.contains(identity) {
            continue;
        }

        let display = match record.get(display_field) {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => UNNAMED.to_string(),
        };

        additions.push(Addition {
            identity: identity.to_string(),
            display,
        });
    }

    if additions.is_empty() {
        tracing::debug!(label = resource_label, "no additions detected");
        return None;
    }

    tracing::info!(
        label = resource_label,
        added = additions.len(),
        "additions detected"
    );

    Some(ChangeEntry {
        resource_label: resource_label.to_string(),
        detected_at: Utc::now(),
        additions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NormalizedRecord;

    fn record(id: &str, name: &str) -> NormalizedRecord {
        let mut r = NormalizedRecord::default();
        r.insert("物品ID", id);
        if !name.is_empty() {
            r.insert("物品名称", name);
        }
        r
    }

    fn set(records: Vec<NormalizedRecord>) -> RecordSet {
        RecordSet { records }
    }

    fn previous(ids: &[&str]) -> Vec<PreviousRecord> {
        ids.iter()
            .map(|id| PreviousRecord {
                identity: id.to_string(),
                display: format!("old-{}", id),
            })
            .collect()
    }

    #[test]
    fn reports_exactly_the_added_identities() {
        let new = set(vec![record("1", "a"), record("2", "b"), record("3", "c")]);
        let prev = previous(&["1", "2"]);

        let entry = detect_additions("物品列表", &new, Some(&prev), "物品ID", "物品名称").unwrap();
        assert_eq!(entry.identities(), vec!["3"]);
        assert_eq!(entry.additions[0].display, "c");
        assert_eq!(entry.resource_label, "物品列表");
    }

    #[test]
    fn removals_are_never_reported() {
        let new = set(vec![record("1", "a"), record("2", "b"), record("3", "c")]);
        let prev = previous(&["1", "2", "3", "4"]);

        assert!(detect_additions("物品列表", &new, Some(&prev), "物品ID", "物品名称").is_none());
    }

    #[test]
    fn first_run_yields_no_entry_regardless_of_contents() {
        let new = set(vec![record("1", "a"), record("2", "b")]);
        assert!(detect_additions("物品列表", &new, None, "物品ID", "物品名称").is_none());
    }

    #[test]
    fn empty_difference_yields_no_entry() {
        let new = set(vec![record("1", "a")]);
        let prev = previous(&["1"]);
        assert!(detect_additions("物品列表", &new, Some(&prev), "物品ID", "物品名称").is_none());
    }

    #[test]
    fn blank_display_falls_back_to_unnamed() {
        let new = set(vec![record("9", ""), record("10", "  ")]);
        let prev = previous(&[]);

        let entry = detect_additions("物品列表", &new, Some(&prev), "物品ID", "物品名称").unwrap();
        assert_eq!(entry.additions[0].display, "unnamed");
        assert_eq!(entry.additions[1].display, "unnamed");
    }

    #[test]
    fn records_without_identity_are_skipped() {
        let mut nameless = NormalizedRecord::default();
        nameless.insert("物品名称", "幽灵");

        let new = set(vec![nameless, record("5", "e")]);
        let prev = previous(&[]);

        let entry = detect_additions("物品列表", &new, Some(&prev), "物品ID", "物品名称").unwrap();
        assert_eq!(entry.identities(), vec!["5"]);
    }
}
