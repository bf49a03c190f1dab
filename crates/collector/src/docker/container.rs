//! Container domain — source listing and raw log streaming.

use std::pin::Pin;

use bollard::query_parameters::{ListContainersOptions, LogsOptions};
use futures_util::stream::StreamExt;

use super::client::{DockerClient, DockerError};
use super::inventory::SourceInfo;
use crate::source::{ByteStream, LogSource};

impl DockerClient {
    /// List running containers. Stopped containers are invisible to the
    /// collector; their disappearance from this list is what retires a
    /// source.
    pub async fn list_running(&self) -> Result<Vec<SourceInfo>, DockerError> {
        let options = Some(ListContainersOptions {
            all: false,
            ..Default::default()
        });
        let containers = self.client.list_containers(options).await?;
        Ok(containers.into_iter().map(|c| c.into()).collect())
    }

    /// Open a follow-mode log stream delivering raw bytes.
    ///
    /// `timestamps` stays off: the parser extracts the application's own
    /// timestamps, and a Docker-prepended one would shadow them.
    pub async fn open_raw_logs(
        &self,
        container_id: &str,
        since: Option<i64>,
    ) -> Result<ByteStream, DockerError> {
        // NOTE: Bollard v0.20 requires i32 for since (Unix seconds).
        let since_raw = since.unwrap_or(0);
        if since_raw > i32::MAX as i64 {
            tracing::warn!(
                since = since_raw,
                max = i32::MAX,
                "Timestamp exceeds i32 range (year 2038 limit) — clamping to i32::MAX. \
                 Bollard v0.20 does not support i64 timestamps."
            );
        }
        let since = since_raw.clamp(0, i32::MAX as i64) as i32;

        let options = LogsOptions {
            follow: true,
            stdout: true,
            stderr: true,
            since,
            until: 0,
            timestamps: false,
            tail: "all".to_string(),
        };

        let stream = self
            .client
            .logs(container_id, Some(options))
            .map(|result| match result {
                Ok(output) => Ok(output.into_bytes()),
                Err(e) => Err(DockerError::from(e)),
            });

        Ok(Box::pin(stream))
    }
}

impl LogSource for DockerClient {
    fn list_sources(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<SourceInfo>, DockerError>> + Send + '_>>
    {
        Box::pin(self.list_running())
    }

    fn open<'a>(
        &'a self,
        source_id: &'a str,
        since: Option<i64>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ByteStream, DockerError>> + Send + 'a>>
    {
        Box::pin(self.open_raw_logs(source_id, since))
    }
}
