use std::sync::Arc;

use dashmap::DashMap;

use crate::config::CollectorConfig;
use crate::docker::inventory::SourceInfo;
use crate::ingest::interpolate::InterpolationState;
use crate::source::LogSource;

/// Shared application state.
///
/// `sources` is the reconciler's mark-and-sweep inventory cache and is
/// mutated only by the coordinator; `last_seen` is written only by the
/// consumer. Both may be read concurrently for status and diagnostics.
pub struct CollectorState {
    pub sources: DashMap<String, SourceInfo>,
    pub transport: Arc<dyn LogSource>,
    pub config: CollectorConfig,
    pub last_seen: InterpolationState,
}

impl CollectorState {
    pub fn new(transport: Arc<dyn LogSource>, config: CollectorConfig) -> Self {
        Self {
            sources: DashMap::new(),
            transport,
            config,
            last_seen: InterpolationState::new(),
        }
    }
}

pub type SharedState = Arc<CollectorState>;
