//! Drives the per-resource loop: fetch, normalize, detect, persist,
//! log.

use std::fs;

use serde_json::Value;

use crate::changelog::ChangeLog;
use crate::config::TrackerConfig;
use crate::detector;
use crate::error::{Result, TrackerError};
use crate::events::{EventSink, Severity, TrackerEvent};
use crate::fetcher::{BundleFetcher, FetchOutcome};
use crate::normalizer;
use crate::sink::RecordSink;
use crate::types::{ResourceDescriptor, RunSummary, VersionFingerprint};
use crate::version_store::VersionStore;

/// Per-resource result inside one run.
enum Processed {
    UpToDate,
    Updated {
        fingerprint: VersionFingerprint,
        records: usize,
        added: usize,
    },
    Unreachable {
        reason: String,
    },
}

/// Sequential pipeline over a fixed, ordered list of resources.
///
/// One resource failing never affects its siblings; fingerprints are
/// staged in memory and the version store is saved once at the end of
/// the run.
pub struct Orchestrator<F, S> {
    config: TrackerConfig,
    resources: Vec<ResourceDescriptor>,
    fetcher: F,
    sink: S,
    changelog: ChangeLog,
    version_store: VersionStore,
}

impl<F: BundleFetcher, S: RecordSink> Orchestrator<F, S> {
    pub fn new(
        config: TrackerConfig,
        resources: Vec<ResourceDescriptor>,
        fetcher: F,
        sink: S,
    ) -> Self {
        let changelog = ChangeLog::new(config.work_dir.join("changes.log"));
        let version_store = VersionStore::new(config.work_dir.join("versions.json"));
        Self {
            config,
            resources,
            fetcher,
            sink,
            changelog,
            version_store,
        }
    }

    /// Run one full pass. The only blocking error is a working
    /// directory that cannot be created; everything else degrades to
    /// per-resource failures.
    pub async fn run(&self, events: &dyn EventSink) -> Result<RunSummary> {
        fs::create_dir_all(&self.config.work_dir).map_err(|e| TrackerError::WorkDir {
            path: self.config.work_dir.clone(),
            source: e,
        })?;

        let mut versions = self.version_store.load();

        events.emit(TrackerEvent::new(
            Severity::Info,
            format!("checking {} resources for updates", self.resources.len()),
        ));

        let mut updated = 0usize;
        let mut up_to_date = 0usize;
        let mut failed = 0usize;

        for descriptor in &self.resources {
            events.emit(TrackerEvent::new(
                Severity::Info,
                format!("checking {} ({})", descriptor.label, descriptor.key),
            ));

            let last = versions.get(&descriptor.key).cloned();
            match self.process_resource(descriptor, last.as_ref(), events).await {
                Ok(Processed::UpToDate) => {
                    up_to_date += 1;
                    events.emit(TrackerEvent::new(
                        Severity::Info,
                        format!("{} is up to date", descriptor.label),
                    ));
                }
                Ok(Processed::Updated {
                    fingerprint,
                    records,
                    added,
                }) => {
                    versions.insert(descriptor.key.clone(), fingerprint);
                    updated += 1;
                    events.emit(TrackerEvent::new(
                        Severity::Success,
                        format!(
                            "{}: {} records persisted, {} new",
                            descriptor.label, records, added
                        ),
                    ));
                }
                Ok(Processed::Unreachable { reason }) => {
                    failed += 1;
                    tracing::warn!(
                        resource = %descriptor.key,
                        reason = %reason,
                        "resource unreachable"
                    );
                    events.emit(TrackerEvent::new(
                        Severity::Warning,
                        format!("{} unreachable: {}", descriptor.label, reason),
                    ));
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(
                        resource = %descriptor.key,
                        error = %e,
                        "resource processing failed"
                    );
                    events.emit(TrackerEvent::new(
                        Severity::Error,
                        format!("{} failed: {}", descriptor.label, e),
                    ));
                }
            }
        }

        // Store-save failures are logged, never fatal: the next run
        // simply re-fetches whatever was lost.
        if let Err(e) = self.version_store.save(&versions) {
            tracing::warn!(error = %e, "version store save failed");
            events.emit(TrackerEvent::new(
                Severity::Warning,
                format!("version store save failed: {}", e),
            ));
        }

        let had_updates = updated > 0;
        let message = format!(
            "{} updated, {} up to date, {} failed",
            updated, up_to_date, failed
        );
        events.emit(TrackerEvent::new(
            if had_updates {
                Severity::Success
            } else {
                Severity::Info
            },
            format!("run complete: {}", message),
        ));

        Ok(RunSummary {
            had_updates,
            checked: self.resources.len(),
            updated,
            failed,
            message,
        })
    }

    async fn process_resource(
        &self,
        descriptor: &ResourceDescriptor,
        last: Option<&VersionFingerprint>,
        events: &dyn EventSink,
    ) -> Result<Processed> {
        let outcome = self.fetcher.check_and_fetch(descriptor, last).await?;

        let (payload, fingerprint) = match outcome {
            FetchOutcome::UpToDate => return Ok(Processed::UpToDate),
            FetchOutcome::Unreachable { reason } => {
                return Ok(Processed::Unreachable { reason })
            }
            FetchOutcome::Updated {
                payload,
                fingerprint,
            } => (payload, fingerprint),
        };

        let document: Value =
            serde_json::from_str(&payload).map_err(|e| TrackerError::Payload {
                resource: descriptor.key.clone(),
                source: e,
            })?;

        let records = normalizer::normalize(&document, descriptor);

        // A failed comparison read means "no previous data": the diff
        // is skipped rather than the resource failed.
        let previous = match self.sink.read_previous(descriptor) {
            Ok(previous) => previous,
            Err(e) => {
                tracing::warn!(
                    resource = %descriptor.key,
                    error = %e,
                    "previous records unreadable"
                );
                events.emit(TrackerEvent::new(
                    Severity::Warning,
                    format!(
                        "{}: previous records unreadable, treating as first run",
                        descriptor.label
                    ),
                ));
                None
            }
        };

        let entry = detector::detect_additions(
            &descriptor.label,
            &records,
            previous.as_deref(),
            &descriptor.identity_field,
            &descriptor.display_field,
        );

        if let Err(e) = self.sink.write(descriptor, &records) {
            tracing::warn!(resource = %descriptor.key, error = %e, "record sink write failed");
            events.emit(TrackerEvent::new(
                Severity::Warning,
                format!("{}: record sink write failed: {}", descriptor.label, e),
            ));
        }

        let added = match &entry {
            Some(entry) => entry.additions.len(),
            None => 0,
        };

        if let Some(entry) = &entry {
            match self.changelog.append(entry) {
                Ok(()) => events.emit(TrackerEvent::new(
                    Severity::Success,
                    format!(
                        "{}: {} new entries recorded to the change log",
                        descriptor.label, added
                    ),
                )),
                Err(e) => {
                    tracing::warn!(resource = %descriptor.key, error = %e, "change log append failed");
                    events.emit(TrackerEvent::new(
                        Severity::Warning,
                        format!("{}: change log append failed: {}", descriptor.label, e),
                    ));
                }
            }
        }

        Ok(Processed::Updated {
            fingerprint,
            records: records.len(),
            added,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use crate::sink::CsvRecordSink;
    use crate::types::FieldMapping;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct ScriptedFetcher {
        outcomes: HashMap<String, FetchOutcome>,
    }

    #[async_trait]
    impl BundleFetcher for ScriptedFetcher {
        async fn check_and_fetch(
            &self,
            descriptor: &ResourceDescriptor,
            _last: Option<&VersionFingerprint>,
        ) -> Result<FetchOutcome> {
            Ok(self
                .outcomes
                .get(&descriptor.key)
                .cloned()
                .unwrap_or(FetchOutcome::UpToDate))
        }
    }

    fn descriptor(key: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(
            key,
            "物品列表",
            &["root", "goods"],
            FieldMapping::new().column("a", "物品ID").column("b", "物品名称"),
            "物品ID",
            "物品名称",
        )
    }

    #[tokio::test]
    async fn unreachable_resource_does_not_block_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrackerConfig::default().with_work_dir(dir.path());

        let mut outcomes = HashMap::new();
        outcomes.insert(
            "lista".to_string(),
            FetchOutcome::Unreachable {
                reason: "HTTP 503".to_string(),
            },
        );
        outcomes.insert(
            "listb".to_string(),
            FetchOutcome::Updated {
                payload: r#"{"root": {"goods": [{"a": 1, "b": "甲"}]}}"#.to_string(),
                fingerprint: VersionFingerprint::derive(Some("lm"), Some("10")),
            },
        );

        let orchestrator = Orchestrator::new(
            config,
            vec![descriptor("lista"), descriptor("listb")],
            ScriptedFetcher { outcomes },
            CsvRecordSink::new(dir.path()),
        );

        let summary = orchestrator.run(&NullSink).await.unwrap();
        assert!(summary.had_updates);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.failed, 1);
        assert!(dir.path().join("listb.csv").exists());
        assert!(!dir.path().join("lista.csv").exists());
    }

    #[tokio::test]
    async fn unusable_working_directory_is_a_blocking_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        fs::write(&blocker, "a file where the directory should go").unwrap();

        let config = TrackerConfig::default().with_work_dir(&blocker);
        let orchestrator = Orchestrator::new(
            config,
            vec![descriptor("lista")],
            ScriptedFetcher {
                outcomes: HashMap::new(),
            },
            CsvRecordSink::new(&blocker),
        );

        let err = orchestrator.run(&NullSink).await.unwrap_err();
        assert!(matches!(err, TrackerError::WorkDir { .. }));
    }

    #[tokio::test]
    async fn corrupt_payload_fails_the_resource_without_a_fingerprint_update() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrackerConfig::default().with_work_dir(dir.path());

        let mut outcomes = HashMap::new();
        outcomes.insert(
            "lista".to_string(),
            FetchOutcome::Updated {
                payload: "{broken json".to_string(),
                fingerprint: VersionFingerprint::derive(Some("lm"), Some("10")),
            },
        );

        let orchestrator = Orchestrator::new(
            config,
            vec![descriptor("lista")],
            ScriptedFetcher { outcomes },
            CsvRecordSink::new(dir.path()),
        );

        let summary = orchestrator.run(&NullSink).await.unwrap();
        assert!(!summary.had_updates);
        assert_eq!(summary.failed, 1);

        let store = VersionStore::new(dir.path().join("versions.json"));
        assert!(store.load().is_empty());
    }
}
