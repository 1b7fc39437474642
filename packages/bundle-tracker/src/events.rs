//! One-way event stream from the pipeline to its caller.
//!
//! The orchestrator reports progress as a sequence of timestamped
//! messages; how they are rendered (terminal, widget, nothing) is the
//! caller's concern entirely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A single progress message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerEvent {
    pub at: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
}

impl TrackerEvent {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            severity,
            message: message.into(),
        }
    }
}

/// Receives pipeline events. Implementations must tolerate being
/// called from a worker task.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TrackerEvent);
}

/// Discards all events. Useful in tests and headless callers.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: TrackerEvent) {}
}

/// Forwards events over an unbounded channel to a consumer task.
pub struct ChannelSink {
    tx: tokio::sync::mpsc::UnboundedSender<TrackerEvent>,
}

impl ChannelSink {
    pub fn new(tx: tokio::sync::mpsc::UnboundedSender<TrackerEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: TrackerEvent) {
        // A closed receiver means the consumer went away; events are
        // advisory and must never fail the pipeline.
        let _ = self.tx.send(event);
    }
}
