//! Outbound interfaces — how parsed records leave the core.
//!
//! Collaborators (the index store, the real-time broadcaster, the UI's
//! source list) are out of scope; the core only knows these three traits.
//! Failures never flow back: delivery is fire-and-forget from the
//! consumer's point of view.

use std::sync::Arc;

use serde::Serialize;

use crate::docker::inventory::SourceInfo;
use crate::parser::LogEntry;

/// One delivered record: the parsed entry plus its source and the
/// interpolated timestamp (which may differ from `entry.timestamp` when
/// the entry itself carried none).
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub source_id: String,
    pub timestamp: String,
    pub entry: LogEntry,
}

/// Per-record delivery, called for every parsed entry in source order.
pub trait RecordSink: Send + Sync {
    fn deliver(&self, record: &Record);
}

/// Timed batch delivery. Invoked only with non-empty batches, once per
/// tick, with records in consumption order.
pub trait BatchSink: Send + Sync {
    fn deliver(&self, batch: Vec<Record>);
}

/// Source membership notification, invoked only when the live set changed.
pub trait SourceWatcher: Send + Sync {
    fn sources_changed(&self, sources: &[SourceInfo]);
}

/// Bundle handed to the ingestion tasks.
#[derive(Clone)]
pub struct Sinks {
    pub records: Arc<dyn RecordSink>,
    pub batches: Arc<dyn BatchSink>,
    pub watcher: Arc<dyn SourceWatcher>,
}

impl Sinks {
    /// Default wiring for the standalone binary: JSON lines on stdout,
    /// batch and membership activity on the log.
    pub fn stdout() -> Self {
        Self {
            records: Arc::new(StdoutSink),
            batches: Arc::new(LoggingBatchSink),
            watcher: Arc::new(LoggingSourceWatcher),
        }
    }
}

/// Writes each record as one compact JSON line.
pub struct StdoutSink;

impl RecordSink for StdoutSink {
    fn deliver(&self, record: &Record) {
        if let Ok(line) = serde_json::to_string(record) {
            println!("{line}");
        }
    }
}

pub struct LoggingBatchSink;

impl BatchSink for LoggingBatchSink {
    fn deliver(&self, batch: Vec<Record>) {
        tracing::debug!(records = batch.len(), "batch delivered");
    }
}

pub struct LoggingSourceWatcher;

impl SourceWatcher for LoggingSourceWatcher {
    fn sources_changed(&self, sources: &[SourceInfo]) {
        tracing::info!(count = sources.len(), "live source set changed");
    }
}
