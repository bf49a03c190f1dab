//! Task wiring and graceful shutdown.
//!
//! Shutdown ordering matters: the signal cancels the coordinator, the
//! coordinator cancels its pumps and waits for their flushes, and only
//! then does the channel close — so the consumer drains every flushed
//! entry and delivers the final batch before the process exits.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::ingest::{consumer, Coordinator, Sinks};
use crate::state::SharedState;

/// Run the ingestion engine until a shutdown signal arrives.
pub async fn run(state: SharedState, sinks: Sinks) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = CancellationToken::new();
    let (tx, rx) = mpsc::channel(state.config.channel_capacity);

    let consumer_handle = tokio::spawn(consumer::run_consumer(
        rx,
        state.clone(),
        sinks.clone(),
    ));
    let coordinator = Coordinator::new(state, tx, shutdown.clone(), sinks);
    let coordinator_handle = tokio::spawn(coordinator.run());

    shutdown_signal().await;
    info!("Shutdown signal received, draining streams");
    shutdown.cancel();

    coordinator_handle.await?;
    consumer_handle.await?;
    info!("Collector stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM on Unix).
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).expect("Failed to set up SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to set up SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => info!(signal = "SIGINT", "Signal received"),
        _ = sigterm.recv() => info!(signal = "SIGTERM", "Signal received"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!(signal = "ctrl-c", "Signal received");
}
