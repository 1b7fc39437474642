//! Remote metadata queries, staleness decisions, and bundle
//! download/extraction.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::types::{ResourceDescriptor, VersionFingerprint};

/// Outcome of one staleness check.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Remote fingerprint matches the last-seen one and the extracted
    /// payload is still on disk.
    UpToDate,
    /// A fresh payload was downloaded and extracted.
    Updated {
        payload: String,
        fingerprint: VersionFingerprint,
    },
    /// Metadata query or download failed; the resource is skipped this
    /// run and retried on the next one.
    Unreachable { reason: String },
}

/// Seam between the orchestrator and the network, so the pipeline is
/// testable with a scripted fake.
#[async_trait]
pub trait BundleFetcher: Send + Sync {
    async fn check_and_fetch(
        &self,
        descriptor: &ResourceDescriptor,
        last: Option<&VersionFingerprint>,
    ) -> Result<FetchOutcome>;
}

/// A re-fetch is needed when the archive was never downloaded, the
/// remote fingerprint moved, or the extracted payload went missing
/// under a matching fingerprint.
fn update_needed(
    last: Option<&VersionFingerprint>,
    remote: &VersionFingerprint,
    archive_exists: bool,
    payload_exists: bool,
) -> bool {
    !archive_exists || last != Some(remote) || !payload_exists
}

/// Production fetcher on `reqwest`: header-only metadata query, then a
/// streamed download and single-level zip extraction into the working
/// directory.
pub struct HttpBundleFetcher {
    client: reqwest::Client,
    base_url: Url,
    work_dir: PathBuf,
    head_timeout: Duration,
    fetch_timeout: Duration,
}

impl HttpBundleFetcher {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(config.user_agent.clone())
                .build()
                .expect("Failed to create HTTP client"),
            base_url: config.base_url.clone(),
            work_dir: config.work_dir.clone(),
            head_timeout: config.head_timeout,
            fetch_timeout: config.fetch_timeout,
        }
    }

    fn remote_url(&self, descriptor: &ResourceDescriptor) -> Result<Url> {
        self.base_url
            .join(&descriptor.remote_name())
            .map_err(|e| TrackerError::Network {
                url: format!("{}{}", self.base_url, descriptor.remote_name()),
                source: Box::new(e),
            })
    }

    async fn query_fingerprint(&self, url: &Url) -> std::result::Result<VersionFingerprint, String> {
        let response = self
            .client
            .head(url.clone())
            .timeout(self.head_timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %url, error = %e, "metadata query failed");
                format!("metadata query failed: {}", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {} for {}", status.as_u16(), url));
        }

        // The fingerprint must come from the raw header values; absent
        // headers contribute the literal "None".
        let headers = response.headers();
        let last_modified = headers
            .get(reqwest::header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok());
        let content_length = headers
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok());

        Ok(VersionFingerprint::derive(last_modified, content_length))
    }

    async fn download(&self, url: &Url) -> std::result::Result<Vec<u8>, String> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %url, error = %e, "download failed");
                format!("download failed: {}", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {} for {}", status.as_u16(), url));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| format!("download body failed: {}", e))
    }

    /// Extract every archive entry into the working directory,
    /// overwriting files of the same name. On failure the archive file
    /// stays on disk for inspection and retry.
    fn extract_archive(&self, archive_path: &Path) -> Result<()> {
        let archive_error = |source: Box<dyn std::error::Error + Send + Sync>| TrackerError::Archive {
            path: archive_path.to_path_buf(),
            source,
        };

        let file = fs::File::open(archive_path).map_err(|e| archive_error(Box::new(e)))?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| archive_error(Box::new(e)))?;
        archive
            .extract(&self.work_dir)
            .map_err(|e| archive_error(Box::new(e)))?;

        Ok(())
    }
}

#[async_trait]
impl BundleFetcher for HttpBundleFetcher {
    async fn check_and_fetch(
        &self,
        descriptor: &ResourceDescriptor,
        last: Option<&VersionFingerprint>,
    ) -> Result<FetchOutcome> {
        let url = self.remote_url(descriptor)?;

        let fingerprint = match self.query_fingerprint(&url).await {
            Ok(fp) => fp,
            Err(reason) => return Ok(FetchOutcome::Unreachable { reason }),
        };

        let archive_path = self.work_dir.join(descriptor.archive_name());
        let payload_path = self.work_dir.join(descriptor.payload_name());

        if !update_needed(
            last,
            &fingerprint,
            archive_path.exists(),
            payload_path.exists(),
        ) {
            tracing::debug!(
                resource = %descriptor.key,
                fingerprint = %fingerprint,
                "resource is up to date"
            );
            return Ok(FetchOutcome::UpToDate);
        }

        tracing::info!(
            resource = %descriptor.key,
            url = %url,
            old = ?last.map(|f| f.as_str()),
            new = %fingerprint,
            "fetching updated bundle"
        );

        let body = match self.download(&url).await {
            Ok(body) => body,
            Err(reason) => return Ok(FetchOutcome::Unreachable { reason }),
        };

        fs::write(&archive_path, &body).map_err(|e| TrackerError::Archive {
            path: archive_path.clone(),
            source: Box::new(e),
        })?;

        self.extract_archive(&archive_path)?;

        let payload = fs::read_to_string(&payload_path).map_err(|e| TrackerError::Archive {
            path: payload_path.clone(),
            source: Box::new(e),
        })?;

        tracing::debug!(
            resource = %descriptor.key,
            bytes = body.len(),
            payload_bytes = payload.len(),
            "bundle downloaded and extracted"
        );

        Ok(FetchOutcome::Updated {
            payload,
            fingerprint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(value: &str) -> VersionFingerprint {
        VersionFingerprint(value.to_string())
    }

    #[test]
    fn first_fetch_always_needs_update() {
        assert!(update_needed(None, &fp("a_1"), false, false));
    }

    #[test]
    fn changed_fingerprint_needs_update() {
        assert!(update_needed(Some(&fp("a_1")), &fp("a_2"), true, true));
    }

    #[test]
    fn matching_fingerprint_with_files_present_is_up_to_date() {
        assert!(!update_needed(Some(&fp("a_1")), &fp("a_1"), true, true));
    }

    #[test]
    fn missing_archive_or_payload_forces_refetch() {
        assert!(update_needed(Some(&fp("a_1")), &fp("a_1"), false, true));
        assert!(update_needed(Some(&fp("a_1")), &fp("a_1"), true, false));
    }

    #[test]
    fn extraction_failure_retains_the_archive() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrackerConfig::default().with_work_dir(dir.path());
        let fetcher = HttpBundleFetcher::new(&config);

        let archive_path = dir.path().join("list1.zip");
        fs::write(&archive_path, b"definitely not a zip archive").unwrap();

        let err = fetcher.extract_archive(&archive_path).unwrap_err();
        assert!(matches!(err, TrackerError::Archive { .. }));
        assert!(archive_path.exists());
    }
}
