//! Source abstraction — the inbound interface the ingestion core consumes.
//!
//! A source is anything that can enumerate live containers and open a raw
//! byte stream for one of them. `docker::container` provides the bollard-
//! backed implementation; `fake.rs` provides a deterministic in-memory
//! double for tests. Object-safe thanks to `Pin<Box<…>>` returns, so a
//! `dyn LogSource` can live inside the shared state.

use std::pin::Pin;

use bytes::Bytes;

use crate::docker::client::DockerError;
use crate::docker::inventory::SourceInfo;

pub mod fake;

/// A raw, possibly multiplexed byte stream for one source. The stream may
/// end at any time (EOF) independent of source liveness; the coordinator
/// decides whether that means restart or removal.
pub type ByteStream = Pin<Box<dyn tokio_stream::Stream<Item = Result<Bytes, DockerError>> + Send>>;

pub trait LogSource: Send + Sync {
    /// Enumerate currently known sources with their display metadata.
    fn list_sources(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<SourceInfo>, DockerError>> + Send + '_>>;

    /// Open the byte stream for one source, following new output. `since`
    /// (Unix seconds) limits replay after a stream restart.
    fn open<'a>(
        &'a self,
        source_id: &'a str,
        since: Option<i64>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ByteStream, DockerError>> + Send + 'a>>;
}
