//! Typed errors for the tracking pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! Payload-shape problems (an expected nested key or record list
//! missing) are deliberately not errors: the normalizer returns an
//! empty record set and the condition is logged informationally.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while tracking resource bundles.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Network failure: timeout, connection failure, or transport
    /// error. The affected resource is unreachable this run; siblings
    /// continue.
    #[error("network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Remote answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Downloaded archive could not be decoded or extracted. The
    /// archive file is retained on disk and the fingerprint is not
    /// advanced, so the next run retries.
    #[error("archive error at {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Extracted payload is not a valid JSON document.
    #[error("payload for {resource} is not valid JSON: {source}")]
    Payload {
        resource: String,
        #[source]
        source: serde_json::Error,
    },

    /// A sink read or write failed: the tabular record file, the
    /// change log, or the version store. Never fatal to the run.
    #[error("sink error at {path}: {source}")]
    Sink {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The working directory could not be created. The only blocking
    /// configuration error in the pipeline.
    #[error("cannot prepare working directory {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
