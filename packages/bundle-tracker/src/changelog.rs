//! Append-only audit log of detected additions.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;

use chrono::Local;

use crate::error::{Result, TrackerError};
use crate::types::ChangeEntry;

/// Human-readable text log. Entries are dated blocks, one line per
/// added entity; existing content is never rewritten.
pub struct ChangeLog {
    path: PathBuf,
}

impl ChangeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one entry. Failures are reported to the caller, who
    /// treats them as non-fatal to the rest of the run.
    pub fn append(&self, entry: &ChangeEntry) -> Result<()> {
        let mut block = String::new();
        let timestamp = entry
            .detected_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S");

        writeln!(
            block,
            "=== {} | {} | {} new ===",
            timestamp,
            entry.resource_label,
            entry.additions.len()
        )
        .expect("writing to a String cannot fail");

        for addition in &entry.additions {
            writeln!(block, "[+] {} (ID: {})", addition.display, addition.identity)
                .expect("writing to a String cannot fail");
        }
        block.push('\n');

        let sink_error = |e: std::io::Error| TrackerError::Sink {
            path: self.path.clone(),
            source: Box::new(e),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(sink_error)?;
        file.write_all(block.as_bytes()).map_err(sink_error)?;

        tracing::debug!(
            path = %self.path.display(),
            label = %entry.resource_label,
            added = entry.additions.len(),
            "change log appended"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Addition;
    use chrono::Utc;

    fn entry(label: &str, additions: &[(&str, &str)]) -> ChangeEntry {
        ChangeEntry {
            resource_label: label.to_string(),
            detected_at: Utc::now(),
            additions: additions
                .iter()
                .map(|(id, name)| Addition {
                    identity: id.to_string(),
                    display: name.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn appends_dated_block_with_one_line_per_addition() {
        let dir = tempfile::tempdir().unwrap();
        let log = ChangeLog::new(dir.path().join("changes.log"));

        log.append(&entry("物品列表", &[("1001", "青釭剑"), ("1002", "寒冰剑")]))
            .unwrap();

        let content = std::fs::read_to_string(dir.path().join("changes.log")).unwrap();
        assert!(content.contains("物品列表"));
        assert!(content.contains("2 new"));
        assert!(content.contains("[+] 青釭剑 (ID: 1001)"));
        assert!(content.contains("[+] 寒冰剑 (ID: 1002)"));
    }

    #[test]
    fn append_never_truncates_earlier_entries() {
        let dir = tempfile::tempdir().unwrap();
        let log = ChangeLog::new(dir.path().join("changes.log"));

        log.append(&entry("物品列表", &[("1", "甲")])).unwrap();
        log.append(&entry("技能列表", &[("2", "乙")])).unwrap();

        let content = std::fs::read_to_string(dir.path().join("changes.log")).unwrap();
        assert!(content.contains("[+] 甲 (ID: 1)"));
        assert!(content.contains("[+] 乙 (ID: 2)"));
        assert_eq!(content.matches("===").count(), 4); // two headers, two `===` each
    }
}
