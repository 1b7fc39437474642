//! Persisted record-set sink: the tabular file each resource's
//! normalized records are written to, and re-read from on the next run
//! as comparison input.

use std::path::{Path, PathBuf};

use crate::error::{Result, TrackerError};
use crate::types::{RecordSet, ResourceDescriptor};

/// The two columns read back for diffing. Full-fidelity re-read of the
/// sink is not required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousRecord {
    pub identity: String,
    pub display: String,
}

/// Tabular sink for normalized record sets.
///
/// `write` replaces the resource's file wholesale after each
/// successful normalize; `read_previous` recovers only the identity
/// and display columns of the last run, returning `None` when the
/// resource has never been persisted.
pub trait RecordSink: Send + Sync {
    fn write(&self, descriptor: &ResourceDescriptor, records: &RecordSet) -> Result<()>;

    fn read_previous(&self, descriptor: &ResourceDescriptor)
        -> Result<Option<Vec<PreviousRecord>>>;
}

/// One `{key}.csv` per resource with a header row of semantic field
/// names in mapping order.
pub struct CsvRecordSink {
    dir: PathBuf,
}

impl CsvRecordSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, descriptor: &ResourceDescriptor) -> PathBuf {
        self.dir.join(format!("{}.csv", descriptor.key))
    }
}

fn sink_error(path: &Path, source: impl std::error::Error + Send + Sync + 'static) -> TrackerError {
    TrackerError::Sink {
        path: path.to_path_buf(),
        source: Box::new(source),
    }
}

impl RecordSink for CsvRecordSink {
    fn write(&self, descriptor: &ResourceDescriptor, records: &RecordSet) -> Result<()> {
        let path = self.path_for(descriptor);
        let mut writer = csv::Writer::from_path(&path).map_err(|e| sink_error(&path, e))?;

        let header = descriptor.mapping.semantic_names();
        writer
            .write_record(&header)
            .map_err(|e| sink_error(&path, e))?;

        for record in records.iter() {
            let row: Vec<&str> = header
                .iter()
                .map(|name| record.get(name).unwrap_or(""))
                .collect();
            writer.write_record(&row).map_err(|e| sink_error(&path, e))?;
        }

        writer.flush().map_err(|e| sink_error(&path, e))?;

        tracing::debug!(
            resource = %descriptor.key,
            rows = records.len(),
            path = %path.display(),
            "record sink written"
        );

        Ok(())
    }

    fn read_previous(
        &self,
        descriptor: &ResourceDescriptor,
    ) -> Result<Option<Vec<PreviousRecord>>> {
        let path = self.path_for(descriptor);
        if !path.exists() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(&path).map_err(|e| sink_error(&path, e))?;

        let headers = reader.headers().map_err(|e| sink_error(&path, e))?.clone();
        let identity_ix = headers
            .iter()
            .position(|h| h == descriptor.identity_field);
        let display_ix = headers.iter().position(|h| h == descriptor.display_field);

        // A sink without the identity column cannot be diffed against;
        // treat it like a first run.
        let Some(identity_ix) = identity_ix else {
            tracing::warn!(
                resource = %descriptor.key,
                identity = %descriptor.identity_field,
                "persisted sink is missing the identity column, treating as no previous data"
            );
            return Ok(None);
        };

        let mut previous = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| sink_error(&path, e))?;
            let Some(identity) = row.get(identity_ix) else {
                continue;
            };
            let display = display_ix
                .and_then(|ix| row.get(ix))
                .unwrap_or("")
                .to_string();
            previous.push(PreviousRecord {
                identity: identity.to_string(),
                display,
            });
        }

        Ok(Some(previous))
    }
}
