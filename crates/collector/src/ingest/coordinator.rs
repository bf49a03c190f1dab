//! Ingestion coordinator — one pump task per live source.
//!
//! A reconcile loop polls the source listing on a fixed interval and
//! converges the task set: new sources get a pump, sources whose stream
//! ended while still listed get a restart (a transient EOF is not an
//! intentional stop), and delisted sources are cancelled and forgotten.
//! Docker being slow or down never empties the inventory — stale data
//! beats no data, and repeated failures only escalate log severity.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::docker::inventory::SourceInfo;
use crate::source::LogSource;
use crate::state::SharedState;
use crate::stream::Reassembler;

use super::consumer::SourceRecord;
use super::sink::Sinks;

const LIST_TIMEOUT: Duration = Duration::from_secs(5);

struct SourceTask {
    cancel: CancellationToken,
    join: tokio::task::JoinHandle<()>,
}

pub struct Coordinator {
    state: SharedState,
    tx: mpsc::Sender<SourceRecord>,
    shutdown: CancellationToken,
    sinks: Sinks,
    tasks: HashMap<String, SourceTask>,
    tracker: TaskTracker,
    markers: Arc<Vec<String>>,
    consecutive_failures: u32,
}

impl Coordinator {
    pub fn new(
        state: SharedState,
        tx: mpsc::Sender<SourceRecord>,
        shutdown: CancellationToken,
        sinks: Sinks,
    ) -> Self {
        let markers = Arc::new(state.config.multiline_markers.clone());
        Self {
            state,
            tx,
            shutdown,
            sinks,
            tasks: HashMap::new(),
            tracker: TaskTracker::new(),
            markers,
            consecutive_failures: 0,
        }
    }

    /// Run until the shutdown token fires, then stop every pump and wait
    /// for their flushes. Dropping `self` (and with it the sender) is what
    /// lets the consumer drain to completion.
    pub async fn run(mut self) {
        let mut poll = time::interval(Duration::from_millis(self.state.config.poll_interval_ms));
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            interval_ms = self.state.config.poll_interval_ms,
            "coordinator started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = poll.tick() => self.reconcile().await,
            }
        }

        debug!("coordinator shutting down, stopping source streams");
        for task in self.tasks.values() {
            task.cancel.cancel();
        }
        self.tracker.close();
        self.tracker.wait().await;
        info!("coordinator stopped");
    }

    async fn reconcile(&mut self) {
        let listed = match time::timeout(LIST_TIMEOUT, self.state.transport.list_sources()).await {
            Ok(Ok(listed)) => {
                self.consecutive_failures = 0;
                listed
            }
            Ok(Err(e)) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                error!(
                    attempt = self.consecutive_failures,
                    "source listing failed: {}", e
                );
                if self.consecutive_failures >= 3 {
                    warn!(
                        failures = self.consecutive_failures,
                        "source listing has failed repeatedly - check daemon health"
                    );
                }
                return;
            }
            Err(_) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                warn!(
                    timeout = ?LIST_TIMEOUT,
                    attempt = self.consecutive_failures,
                    "source listing timed out"
                );
                return;
            }
        };

        let live: Vec<SourceInfo> = listed.into_iter().filter(|s| s.is_live()).collect();
        let live_ids: HashSet<String> = live.iter().map(|s| s.id.clone()).collect();
        let previous: HashSet<String> = self.tasks.keys().cloned().collect();

        for info in &live {
            let respawn = match self.tasks.get(&info.id) {
                None => Some(None),
                // The stream ended but the source is still listed live:
                // transient EOF, not an intentional stop. Resume from now
                // so already-delivered history is not replayed.
                Some(task) if task.join.is_finished() => {
                    Some(Some(chrono::Utc::now().timestamp()))
                }
                _ => None,
            };
            match respawn {
                Some(None) => {
                    info!(source = %info.name, "source appeared, starting stream");
                    self.spawn_pump(info, None);
                }
                Some(since @ Some(_)) => {
                    info!(source = %info.name, "stream ended while source is live, restarting");
                    self.spawn_pump(info, since);
                }
                None => {}
            }
        }

        self.tasks.retain(|id, task| {
            if live_ids.contains(id) {
                return true;
            }
            info!(source = %id, "source removed, stopping stream");
            task.cancel.cancel();
            self.state.last_seen.forget(id);
            false
        });

        // Mark-and-sweep the shared inventory: upsert then retain, so the
        // cache is never observed empty mid-update.
        for info in &live {
            self.state.sources.insert(info.id.clone(), info.clone());
        }
        self.state.sources.retain(|id, _| live_ids.contains(id));

        if live_ids != previous {
            self.sinks.watcher.sources_changed(&live);
        }
    }

    fn spawn_pump(&mut self, info: &SourceInfo, since: Option<i64>) {
        let cancel = self.shutdown.child_token();
        let join = self.tracker.spawn(pump(
            Arc::clone(&self.state.transport),
            info.clone(),
            self.tx.clone(),
            cancel.clone(),
            since,
            Arc::clone(&self.markers),
            self.state.config.max_entry_lines,
        ));
        self.tasks
            .insert(info.id.clone(), SourceTask { cancel, join });
    }
}

/// One source's pump: read chunks, reassemble, forward entries. Blocks
/// only on its own stream and on channel backpressure. Every exit path —
/// cancellation, EOF, transport error — flushes the reassembler first, so
/// the only data lost on an ungraceful kill is the open multi-line tail.
async fn pump(
    source: Arc<dyn LogSource>,
    info: SourceInfo,
    tx: mpsc::Sender<SourceRecord>,
    cancel: CancellationToken,
    since: Option<i64>,
    markers: Arc<Vec<String>>,
    max_entry_lines: usize,
) {
    let source_id: Arc<str> = Arc::from(info.id.as_str());
    let mut stream = match source.open(&info.id, since).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(source = %info.name, "failed to open log stream: {}", e);
            return;
        }
    };
    let mut reassembler = Reassembler::new(Arc::clone(&source_id), markers, max_entry_lines);
    debug!(source = %info.name, ?since, "stream opened");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(source = %info.name, "stream cancelled");
                break;
            }
            next = stream.next() => match next {
                Some(Ok(chunk)) => {
                    for entry in reassembler.push_chunk(&chunk) {
                        let record = SourceRecord { source_id: Arc::clone(&source_id), entry };
                        if tx.send(record).await.is_err() {
                            return;
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!(source = %info.name, "log stream error: {}", e);
                    break;
                }
                None => {
                    debug!(source = %info.name, "log stream ended");
                    break;
                }
            }
        }
    }

    for entry in reassembler.finish() {
        let record = SourceRecord { source_id: Arc::clone(&source_id), entry };
        if tx.send(record).await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    use crate::config::CollectorConfig;
    use crate::ingest::testutil::collecting_sinks;
    use crate::source::fake::{FakeContainer, FakeSource};
    use crate::state::CollectorState;

    fn state_with(fake: Arc<FakeSource>) -> SharedState {
        Arc::new(CollectorState::new(fake, CollectorConfig::default()))
    }

    async fn recv_timeout(rx: &mut mpsc::Receiver<SourceRecord>) -> SourceRecord {
        time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for record")
            .expect("channel closed unexpectedly")
    }

    // ─── pump ───────────────────────────────────────────────────

    #[tokio::test]
    async fn test_pump_reassembles_and_forwards() {
        let fake = Arc::new(FakeSource::new());
        let container = FakeContainer::new(
            "c1",
            "web",
            vec![
                b"2024-01-01T00:00:00Z ERROR boom\n    at main.run\n".to_vec(),
                b"2024-01-01T00:00:01Z INFO recovered\n".to_vec(),
            ],
        );
        let info = container.info.clone();
        fake.add_container(container).await;

        let (tx, mut rx) = mpsc::channel(16);
        pump(
            fake,
            info,
            tx,
            CancellationToken::new(),
            None,
            Arc::new(vec![]),
            100,
        )
        .await;

        let first = recv_timeout(&mut rx).await;
        assert_eq!(&*first.source_id, "c1");
        assert_eq!(
            first.entry.raw,
            "2024-01-01T00:00:00Z ERROR boom\n    at main.run"
        );
        let second = recv_timeout(&mut rx).await;
        assert_eq!(second.entry.message, "recovered");
        assert!(rx.recv().await.is_none(), "pump dropped its sender at EOF");
    }

    #[tokio::test]
    async fn test_pump_flushes_open_entry_on_eof() {
        let fake = Arc::new(FakeSource::new());
        let container = FakeContainer::new(
            "c1",
            "web",
            // No trailing newline and an open multi-line entry.
            vec![b"2024-01-01T00:00:00Z ERROR partial\n    tail line".to_vec()],
        );
        let info = container.info.clone();
        fake.add_container(container).await;

        let (tx, mut rx) = mpsc::channel(16);
        pump(
            fake,
            info,
            tx,
            CancellationToken::new(),
            None,
            Arc::new(vec![]),
            100,
        )
        .await;

        let entry = recv_timeout(&mut rx).await.entry;
        assert_eq!(entry.raw, "2024-01-01T00:00:00Z ERROR partial\n    tail line");
    }

    #[tokio::test]
    async fn test_pump_multiplexed_frames() {
        fn frame(payload: &[u8]) -> Vec<u8> {
            let mut out = vec![1, 0, 0, 0];
            out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            out.extend_from_slice(payload);
            out
        }

        let fake = Arc::new(FakeSource::new());
        let container = FakeContainer::new(
            "c1",
            "web",
            vec![frame(b"2024-01-01T00:00:00Z one\n"), frame(b"2024-01-01T00:00:01Z two\n")],
        );
        let info = container.info.clone();
        fake.add_container(container).await;

        let (tx, mut rx) = mpsc::channel(16);
        pump(
            fake,
            info,
            tx,
            CancellationToken::new(),
            None,
            Arc::new(vec![]),
            100,
        )
        .await;

        assert_eq!(recv_timeout(&mut rx).await.entry.message, "one");
        assert_eq!(recv_timeout(&mut rx).await.entry.message, "two");
    }

    // ─── reconcile ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_reconcile_spawns_and_notifies() {
        let fake = Arc::new(FakeSource::new());
        fake.add_container(FakeContainer::new(
            "c1",
            "web",
            vec![b"2024-01-01T00:00:00Z hello\n".to_vec()],
        ))
        .await;

        let state = state_with(fake);
        let (collecting, sinks) = collecting_sinks();
        let (tx, mut rx) = mpsc::channel(16);
        let mut coordinator =
            Coordinator::new(state, tx, CancellationToken::new(), sinks);

        coordinator.reconcile().await;
        assert!(coordinator.tasks.contains_key("c1"));
        assert_eq!(coordinator.state.sources.len(), 1);

        let record = recv_timeout(&mut rx).await;
        assert_eq!(record.entry.message, "hello");

        let sets = collecting.source_sets.lock().unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0], vec!["c1".to_string()]);
    }

    #[tokio::test]
    async fn test_reconcile_no_notification_without_change() {
        let fake = Arc::new(FakeSource::new());
        fake.add_container(FakeContainer::new("c1", "web", vec![])).await;

        let state = state_with(fake);
        let (collecting, sinks) = collecting_sinks();
        let (tx, _rx) = mpsc::channel(16);
        let mut coordinator =
            Coordinator::new(state, tx, CancellationToken::new(), sinks);

        coordinator.reconcile().await;
        // Give the (empty) pump time to finish, then hold membership flat.
        sleep(Duration::from_millis(50)).await;
        coordinator.reconcile().await;

        let sets = collecting.source_sets.lock().unwrap();
        assert_eq!(sets.len(), 1, "unchanged membership must not notify");
    }

    #[tokio::test]
    async fn test_reconcile_restarts_live_source_after_eof() {
        let fake = Arc::new(FakeSource::new());
        fake.add_container(FakeContainer::new(
            "c1",
            "web",
            vec![b"2024-01-01T00:00:00Z ping\n".to_vec()],
        ))
        .await;

        let state = state_with(fake);
        let (_collecting, sinks) = collecting_sinks();
        let (tx, mut rx) = mpsc::channel(16);
        let mut coordinator =
            Coordinator::new(state, tx, CancellationToken::new(), sinks);

        coordinator.reconcile().await;
        let first = recv_timeout(&mut rx).await;
        assert_eq!(first.entry.message, "ping");

        // The canned stream hits EOF, but the container is still listed
        // live — the next reconcile must restart the pump.
        sleep(Duration::from_millis(50)).await;
        assert!(coordinator.tasks.get("c1").unwrap().join.is_finished());

        coordinator.reconcile().await;
        let second = recv_timeout(&mut rx).await;
        assert_eq!(second.entry.message, "ping");
    }

    #[tokio::test]
    async fn test_reconcile_retires_removed_source() {
        let fake = Arc::new(FakeSource::new());
        fake.add_container(FakeContainer::new(
            "c1",
            "web",
            vec![b"2024-01-01T00:00:00Z bye\n".to_vec()],
        ))
        .await;

        let state = state_with(fake.clone());
        let (collecting, sinks) = collecting_sinks();
        let (tx, mut rx) = mpsc::channel(16);
        let mut coordinator =
            Coordinator::new(state.clone(), tx, CancellationToken::new(), sinks);

        coordinator.reconcile().await;
        let _ = recv_timeout(&mut rx).await;
        state.last_seen.observe("c1", "2024-01-01T00:00:00Z");

        fake.set_state("c1", "exited").await;
        coordinator.reconcile().await;

        assert!(coordinator.tasks.is_empty());
        assert_eq!(coordinator.state.sources.len(), 0);
        // Interpolation state goes with the source.
        assert!(state.last_seen.get("c1").is_none());

        let sets = collecting.source_sets.lock().unwrap();
        assert_eq!(sets.last().unwrap().len(), 0);
    }

    // ─── full shutdown path ─────────────────────────────────────

    #[tokio::test]
    async fn test_run_flushes_and_closes_channel_on_shutdown() {
        let fake = Arc::new(FakeSource::new());
        fake.add_container(FakeContainer::new(
            "c1",
            "web",
            vec![b"2024-01-01T00:00:00Z steady\n".to_vec()],
        ))
        .await;

        let config = CollectorConfig {
            poll_interval_ms: 20,
            ..CollectorConfig::default()
        };
        let state = Arc::new(CollectorState::new(fake, config));
        let (_collecting, sinks) = collecting_sinks();
        let (tx, mut rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();

        let coordinator = Coordinator::new(state, tx, shutdown.clone(), sinks);
        let handle = tokio::spawn(coordinator.run());

        // Drain like the real consumer would; the channel closing is the
        // signal that every pump flushed and the coordinator dropped its
        // sender.
        let drainer = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(record) = rx.recv().await {
                seen.push(record);
            }
            seen
        });

        sleep(Duration::from_millis(60)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let seen = drainer.await.unwrap();
        assert!(!seen.is_empty());
        assert_eq!(seen[0].entry.message, "steady");
    }
}
