//! Persisted mapping from resource key to last-seen version
//! fingerprint.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::{Result, TrackerError};
use crate::types::VersionFingerprint;

/// Whole-file JSON store, one object mapping resource key to
/// fingerprint string. Single writer assumed; saves go through a temp
/// file plus rename so a crashed run never leaves a half-written
/// store.
pub struct VersionStore {
    path: PathBuf,
}

impl VersionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the stored fingerprints. A missing or corrupt file is an
    /// empty store, never a failure: the pipeline re-fetches and
    /// rebuilds it.
    pub fn load(&self) -> HashMap<String, VersionFingerprint> {
        let Ok(bytes) = fs::read(&self.path) else {
            return HashMap::new();
        };

        match serde_json::from_slice(&bytes) {
            Ok(versions) => versions,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "version store unreadable, starting from an empty store"
                );
                HashMap::new()
            }
        }
    }

    /// Overwrite the store with `versions`.
    pub fn save(&self, versions: &HashMap<String, VersionFingerprint>) -> Result<()> {
        let body = serde_json::to_vec_pretty(versions).map_err(|e| TrackerError::Sink {
            path: self.path.clone(),
            source: Box::new(e),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|e| TrackerError::Sink {
            path: tmp.clone(),
            source: Box::new(e),
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| TrackerError::Sink {
            path: self.path.clone(),
            source: Box::new(e),
        })?;

        tracing::debug!(
            path = %self.path.display(),
            entries = versions.len(),
            "version store saved"
        );

        Ok(())
    }
}
