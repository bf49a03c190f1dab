//! Fake — deterministic test double for the source abstraction.
//!
//! Serves canned byte chunks from in-memory state, so reassembly and
//! coordination can be tested without a running Docker daemon. Builder
//! methods seed containers before the test body runs.

use std::collections::HashMap;
use std::pin::Pin;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::docker::client::DockerError;
use crate::docker::inventory::SourceInfo;

use super::{ByteStream, LogSource};

/// A canned container for the fake store.
#[derive(Clone, Debug)]
pub struct FakeContainer {
    pub info: SourceInfo,
    /// Byte chunks delivered in order by `open`; the stream ends after the
    /// last one (EOF).
    pub chunks: Vec<Vec<u8>>,
}

impl FakeContainer {
    pub fn new(id: &str, name: &str, chunks: Vec<Vec<u8>>) -> Self {
        Self {
            info: SourceInfo {
                id: id.to_string(),
                name: name.to_string(),
                image: "busybox:latest".to_string(),
                state: "running".to_string(),
                status: "Up 1 minute".to_string(),
                labels: HashMap::new(),
                created_at: 1_700_000_000,
            },
            chunks,
        }
    }
}

#[derive(Default)]
struct Inner {
    containers: HashMap<String, FakeContainer>,
}

pub struct FakeSource {
    inner: Mutex<Inner>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Seed a container into the fake store.
    pub async fn add_container(&self, container: FakeContainer) {
        let mut state = self.inner.lock().await;
        state.containers.insert(container.info.id.clone(), container);
    }

    /// Change a container's reported state ("running", "exited", ...).
    pub async fn set_state(&self, id: &str, state: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(c) = inner.containers.get_mut(id) {
            c.info.state = state.to_string();
        }
    }

    /// Remove a container entirely, as if it were deleted.
    pub async fn remove(&self, id: &str) {
        self.inner.lock().await.containers.remove(id);
    }
}

impl Default for FakeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSource for FakeSource {
    fn list_sources(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<SourceInfo>, DockerError>> + Send + '_>>
    {
        Box::pin(async {
            let state = self.inner.lock().await;
            Ok(state
                .containers
                .values()
                .filter(|c| c.info.is_live())
                .map(|c| c.info.clone())
                .collect())
        })
    }

    fn open<'a>(
        &'a self,
        source_id: &'a str,
        _since: Option<i64>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ByteStream, DockerError>> + Send + 'a>>
    {
        Box::pin(async move {
            let state = self.inner.lock().await;
            let container = state
                .containers
                .get(source_id)
                .ok_or_else(|| DockerError::ContainerNotFound(source_id.to_string()))?;

            let chunks: Vec<Result<Bytes, DockerError>> = container
                .chunks
                .iter()
                .map(|c| Ok(Bytes::from(c.clone())))
                .collect();
            Ok(Box::pin(tokio_stream::iter(chunks)) as ByteStream)
        })
    }
}
