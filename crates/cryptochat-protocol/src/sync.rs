//! Message synchronization
//!
//! [`SyncLoop`] runs two tasks: a poller that fetches the profile's message
//! list from the relay on a fixed interval, and a merger that applies each
//! fetched batch to the [`LocalStore`]. Batches travel over a bounded
//! channel; the merger broadcasts [`SyncEvent::NewMessages`] when a merge
//! added something. Merges run on the blocking pool since the blob store may
//! flush to disk. Failures are logged and retried on the next tick.

use std::sync::Arc;

use cryptochat_core::{LocalStore, Message};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{ProtocolError, Result};
use crate::relay::RelayApi;

/// Notification for subscribers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncEvent {
    /// A poll appended `messages` to the store, in arrival order
    NewMessages { messages: Vec<Message> },
}

struct SyncTasks {
    poller: JoinHandle<()>,
    merger: JoinHandle<()>,
}

impl SyncTasks {
    fn abort(&self) {
        self.poller.abort();
        self.merger.abort();
    }

    fn is_finished(&self) -> bool {
        self.poller.is_finished() && self.merger.is_finished()
    }
}

/// Restartable relay poller
pub struct SyncLoop {
    store: Arc<LocalStore>,
    api: RelayApi,
    config: SyncConfig,
    event_tx: broadcast::Sender<SyncEvent>,
    tasks: Mutex<Option<SyncTasks>>,
}

impl SyncLoop {
    /// Create a stopped loop
    pub fn new(store: Arc<LocalStore>, api: RelayApi, config: SyncConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));
        Self {
            store,
            api,
            config,
            event_tx,
            tasks: Mutex::new(None),
        }
    }

    /// Subscribe to sync events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    /// Start polling, replacing any running poller
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if let Some(previous) = tasks.take() {
            previous.abort();
            debug!("Stopped previous sync tasks");
        }

        let (batch_tx, batch_rx) = mpsc::channel(self.config.batch_channel_capacity.max(1));

        let poller = tokio::spawn(run_poller(
            self.store.clone(),
            self.api.clone(),
            self.config.clone(),
            batch_tx,
        ));
        let merger = tokio::spawn(run_merger(self.store.clone(), self.event_tx.clone(), batch_rx));

        *tasks = Some(SyncTasks { poller, merger });
        info!(interval_ms = self.config.poll_interval_ms, "Message sync started");
    }

    /// Stop polling
    pub fn stop(&self) {
        if let Some(tasks) = self.tasks.lock().take() {
            tasks.abort();
            info!("Message sync stopped");
        }
    }

    /// Whether a poller is active
    pub fn is_running(&self) -> bool {
        self.tasks
            .lock()
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }

    /// Fetch and merge once in the caller's task
    ///
    /// Returns the number of messages added; zero when not registered.
    pub async fn poll_once(&self) -> Result<usize> {
        match fetch(&self.store, &self.api).await? {
            Some(batch) => apply(self.store.clone(), &self.event_tx, batch).await,
            None => Ok(0),
        }
    }
}

impl Drop for SyncLoop {
    fn drop(&mut self) {
        if let Some(tasks) = self.tasks.get_mut().take() {
            tasks.abort();
        }
    }
}

async fn fetch(store: &LocalStore, api: &RelayApi) -> Result<Option<Vec<Message>>> {
    let state = store.snapshot();
    let (id, key) = match (state.profile_id(), state.private_key) {
        (Some(id), Some(key)) => (id, key),
        _ => return Ok(None),
    };

    let reply = api.get_messages(id, &key).await;
    reply.json().map(Some)
}

async fn apply(
    store: Arc<LocalStore>,
    event_tx: &broadcast::Sender<SyncEvent>,
    batch: Vec<Message>,
) -> Result<usize> {
    let messages = tokio::task::spawn_blocking(move || store.merge_new_messages(batch))
        .await
        .map_err(|e| ProtocolError::Internal(format!("merge task: {}", e)))??;

    let added = messages.len();
    if added > 0 {
        debug!(added, "New messages");
        // no subscribers is fine
        let _ = event_tx.send(SyncEvent::NewMessages { messages });
    }
    Ok(added)
}

async fn run_poller(
    store: Arc<LocalStore>,
    api: RelayApi,
    config: SyncConfig,
    batch_tx: mpsc::Sender<Vec<Message>>,
) {
    let mut ticker = tokio::time::interval(config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match fetch(&store, &api).await {
            Ok(Some(batch)) => {
                if batch_tx.send(batch).await.is_err() {
                    break;
                }
            }
            Ok(None) => debug!("Not registered, skipping poll"),
            Err(e) => warn!(error = %e, "Message poll failed"),
        }
    }
}

async fn run_merger(
    store: Arc<LocalStore>,
    event_tx: broadcast::Sender<SyncEvent>,
    mut batch_rx: mpsc::Receiver<Vec<Message>>,
) {
    while let Some(batch) = batch_rx.recv().await {
        if let Err(e) = apply(store.clone(), &event_tx, batch).await {
            warn!(error = %e, "Message merge failed");
        }
    }
}
