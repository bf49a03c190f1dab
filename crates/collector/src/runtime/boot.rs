//! Boot — logging init, config load, Docker connection, state creation.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::CollectorConfig;
use crate::docker::client::DockerClient;
use crate::state::{CollectorState, SharedState};

/// Initialise the tracing / logging subsystem.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collector=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load config, connect to Docker, and build the shared state.
pub async fn boot() -> Result<SharedState, Box<dyn std::error::Error>> {
    info!("Starting log collector");

    let config = CollectorConfig::load()?;
    config.validate()?;
    info!(
        poll_interval_ms = config.poll_interval_ms,
        batch_interval_ms = config.batch_interval_ms,
        channel_capacity = config.channel_capacity,
        "Loaded configuration"
    );

    info!(
        "Connecting to Docker daemon at: {}",
        if config.docker_socket.is_empty() {
            "default socket"
        } else {
            &config.docker_socket
        }
    );

    let docker = DockerClient::new(&config.docker_socket).map_err(|e| {
        error!("Failed to connect to Docker: {}", e);
        e
    })?;
    info!("Successfully connected to Docker daemon");

    Ok(Arc::new(CollectorState::new(Arc::new(docker), config)))
}
