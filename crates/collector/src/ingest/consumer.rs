//! The single consumer draining the shared entry channel.
//!
//! Per record: interpolate the timestamp, deliver to the record sink, and
//! accumulate into the current batch. A ~100ms ticker flushes non-empty
//! batches to real-time subscribers; the select services whichever side is
//! ready without starving the other. The task exits when the channel
//! closes (every producer is gone), flushing the final batch — so shutdown
//! ordering is: cancel producers, wait for their flushes, drop the sender.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::parser::LogEntry;
use crate::state::SharedState;

use super::sink::{Record, Sinks};

/// One parsed entry tagged with its source, in flight to the consumer.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub source_id: Arc<str>,
    pub entry: LogEntry,
}

pub async fn run_consumer(
    mut rx: mpsc::Receiver<SourceRecord>,
    state: SharedState,
    sinks: Sinks,
) {
    let mut batch: Vec<Record> = Vec::new();
    let mut ticker = interval(Duration::from_millis(state.config.batch_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(record) => handle_record(record, &state, &sinks, &mut batch),
                None => break,
            },
            _ = ticker.tick() => flush_batch(&mut batch, &sinks),
        }
    }

    flush_batch(&mut batch, &sinks);
    tracing::debug!("consumer stopped");
}

fn handle_record(
    record: SourceRecord,
    state: &SharedState,
    sinks: &Sinks,
    batch: &mut Vec<Record>,
) {
    let timestamp = state
        .last_seen
        .observe(&record.source_id, &record.entry.timestamp);
    let record = Record {
        source_id: record.source_id.to_string(),
        timestamp,
        entry: record.entry,
    };
    sinks.records.deliver(&record);
    batch.push(record);
}

fn flush_batch(batch: &mut Vec<Record>, sinks: &Sinks) {
    if batch.is_empty() {
        return;
    }
    sinks.batches.deliver(std::mem::take(batch));
}
