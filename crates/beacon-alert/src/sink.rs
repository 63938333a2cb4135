//! The alert sink trait and the built-in sinks.

use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

/// How urgent an alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// Errors a sink can surface. Delivery retries, if any, belong to the
/// sink itself — callers only log these.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert delivery failed: {0}")]
    Delivery(String),
}

/// Accepts alerts for delivery.
///
/// Implementations are expected to be non-blocking or to queue
/// internally; the monitors call `send` from polling loops and event
/// handlers and treat failures as non-fatal.
pub trait AlertSink: Send + Sync {
    fn send(&self, severity: Severity, title: &str, message: &str) -> Result<(), AlertError>;
}

/// Sink that delivers alerts as log lines.
///
/// The default sink for environments without a paging integration.
#[derive(Debug, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn send(&self, severity: Severity, title: &str, message: &str) -> Result<(), AlertError> {
        match severity {
            Severity::Info => info!(%severity, title, message, "alert"),
            Severity::Warning => warn!(%severity, title, message, "alert"),
            Severity::Critical => error!(%severity, title, message, "alert"),
        }
        Ok(())
    }
}

/// A delivered alert, as captured by [`MemoryAlertSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRecord {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

/// Sink that records alerts in memory, for assertions in tests.
#[derive(Debug, Default)]
pub struct MemoryAlertSink {
    records: Mutex<Vec<AlertRecord>>,
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far.
    pub fn records(&self) -> Vec<AlertRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl AlertSink for MemoryAlertSink {
    fn send(&self, severity: Severity, title: &str, message: &str) -> Result<(), AlertError> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(AlertRecord {
                severity,
                title: title.to_string(),
                message: message.to_string(),
            });
        Ok(())
    }
}
