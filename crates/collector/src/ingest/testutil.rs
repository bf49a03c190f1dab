//! Shared test doubles for the ingest tasks.

use std::sync::{Arc, Mutex};

use crate::docker::inventory::SourceInfo;

use super::sink::{BatchSink, Record, RecordSink, Sinks, SourceWatcher};

/// Records everything delivered through any of the three sink traits.
#[derive(Default)]
pub(crate) struct Collecting {
    pub records: Mutex<Vec<Record>>,
    pub batches: Mutex<Vec<Vec<Record>>>,
    pub source_sets: Mutex<Vec<Vec<String>>>,
}

impl RecordSink for Collecting {
    fn deliver(&self, record: &Record) {
        self.records.lock().unwrap().push(record.clone());
    }
}

impl BatchSink for Collecting {
    fn deliver(&self, batch: Vec<Record>) {
        self.batches.lock().unwrap().push(batch);
    }
}

impl SourceWatcher for Collecting {
    fn sources_changed(&self, sources: &[SourceInfo]) {
        self.source_sets
            .lock()
            .unwrap()
            .push(sources.iter().map(|s| s.id.clone()).collect());
    }
}

pub(crate) fn collecting_sinks() -> (Arc<Collecting>, Sinks) {
    let collecting = Arc::new(Collecting::default());
    let sinks = Sinks {
        records: collecting.clone(),
        batches: collecting.clone(),
        watcher: collecting.clone(),
    };
    (collecting, sinks)
}
