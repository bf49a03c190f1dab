//! Per-source last-known-timestamp table.
//!
//! A timestamp-less entry inherits the most recently observed real
//! timestamp for its source, so continuation-style output still sorts next
//! to the entry that produced it. The table is written only by the
//! consumer task; status queries may read it concurrently. Entries survive
//! stream restarts and are dropped when the source itself is removed.

use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct InterpolationState {
    last: DashMap<String, String>,
}

impl InterpolationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or interpolate one entry's timestamp. A real timestamp
    /// updates the table and passes through; an empty one is replaced by
    /// the source's last known value (empty when none exists yet).
    pub fn observe(&self, source_id: &str, timestamp: &str) -> String {
        if timestamp.is_empty() {
            self.last
                .get(source_id)
                .map(|entry| entry.value().clone())
                .unwrap_or_default()
        } else {
            self.last
                .insert(source_id.to_string(), timestamp.to_string());
            timestamp.to_string()
        }
    }

    pub fn get(&self, source_id: &str) -> Option<String> {
        self.last.get(source_id).map(|entry| entry.value().clone())
    }

    /// Drop a removed source's state entirely.
    pub fn forget(&self, source_id: &str) {
        self.last.remove(source_id);
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}
