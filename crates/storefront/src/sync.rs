//! Cross-context sync: reload slices when another context rewrites their
//! durable record.

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::slices::ReloadFromStorage;
use crate::storage::{StorageEvent, StorageEvents};

/// Maps watched keys to the slice that owns them.
#[derive(Clone, Default)]
pub struct SyncRouter {
    watchers: Vec<(String, Arc<dyn ReloadFromStorage>)>,
}

impl SyncRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reload `slice` whenever `key` changes elsewhere.
    #[must_use]
    pub fn watch(mut self, key: impl Into<String>, slice: Arc<dyn ReloadFromStorage>) -> Self {
        self.watchers.push((key.into(), slice));
        self
    }

    /// Watched keys, in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.watchers.iter().map(|(key, _)| key.as_str())
    }

    /// Reload every slice `event` concerns. A keyless event reloads all of
    /// them. Returns how many slices were reloaded.
    pub fn route(&self, event: &StorageEvent) -> usize {
        let mut reloaded = 0;
        for (key, slice) in &self.watchers {
            if event.concerns(key) {
                debug!(key, source = %event.source, "Reloading slice after external change");
                slice.reload_from_storage();
                reloaded += 1;
            }
        }
        reloaded
    }
}

impl fmt::Debug for SyncRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncRouter")
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Background task feeding one context's storage events into a
/// [`SyncRouter`].
#[derive(Debug)]
pub struct SyncListener {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl SyncListener {
    /// Start listening. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn spawn(mut events: StorageEvents, router: SyncRouter) -> Self {
        let stop = CancellationToken::new();
        let token = stop.clone();
        let handle = tokio::spawn(async move {
            info!(keys = ?router.keys().collect::<Vec<_>>(), "Sync listener started");
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => {
                            router.route(&event);
                        }
                        None => break,
                    },
                }
            }
            debug!("Sync listener stopped");
        });
        Self { stop, handle }
    }

    /// Stop listening and wait for the task to finish.
    pub async fn shutdown(self) {
        self.stop.cancel();
        let _ = self.handle.await;
    }

    /// Stop listening without waiting.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
