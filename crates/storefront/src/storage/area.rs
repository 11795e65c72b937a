//! Shared storage area and per-context handles.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use super::file::FileBacking;
use super::{Storage, StorageError};

/// Buffered change notifications per subscriber before it is considered
/// lagging.
const EVENT_CAPACITY: usize = 256;

/// Identity of one execution context (one "tab").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Placeholder source for synthesized notifications.
    const fn unknown() -> Self {
        Self(Uuid::nil())
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A change made to the area by some context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Changed key. `None` means "any key may have changed": the whole area
    /// was cleared, or the subscriber missed notifications.
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    /// Context that performed the write.
    pub source: ContextId,
}

impl StorageEvent {
    fn missed() -> Self {
        Self {
            key: None,
            old_value: None,
            new_value: None,
            source: ContextId::unknown(),
        }
    }

    /// Whether this event may concern `key`.
    #[must_use]
    pub fn concerns(&self, key: &str) -> bool {
        self.key.as_deref().is_none_or(|k| k == key)
    }
}

/// The map shared by every context of one profile.
pub struct StorageArea {
    entries: RwLock<BTreeMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
    backing: Option<FileBacking>,
}

impl StorageArea {
    /// An area that lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self::with_entries(BTreeMap::new(), None))
    }

    /// An area written through to a JSON file.
    ///
    /// A missing file starts empty. An unreadable file is moved aside to
    /// `<path>.corrupt` and the area starts empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file exists but cannot be read or
    /// moved aside.
    pub fn open(path: impl Into<PathBuf>) -> Result<Arc<Self>, StorageError> {
        let backing = FileBacking::new(path.into());
        let entries = backing.load()?;
        debug!(path = %backing.path().display(), keys = entries.len(), "Opened storage file");
        Ok(Arc::new(Self::with_entries(entries, Some(backing))))
    }

    fn with_entries(entries: BTreeMap<String, String>, backing: Option<FileBacking>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: RwLock::new(entries),
            events,
            backing,
        }
    }

    /// Open a new context onto this area.
    #[must_use]
    pub fn context(self: &Arc<Self>) -> ContextStorage {
        ContextStorage {
            id: ContextId::new(),
            area: Arc::clone(self),
        }
    }

    /// Keys currently present, in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put(&self, source: ContextId, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let old_value = entries.get(key).cloned();
        if old_value.as_deref() == value {
            return Ok(());
        }

        match value {
            Some(v) => entries.insert(key.to_owned(), v.to_owned()),
            None => entries.remove(key),
        };

        if let Some(backing) = &self.backing
            && let Err(e) = backing.persist(&entries)
        {
            match &old_value {
                Some(v) => entries.insert(key.to_owned(), v.clone()),
                None => entries.remove(key),
            };
            return Err(e);
        }

        // Sent under the lock so subscribers observe writes in commit order.
        let _ = self.events.send(StorageEvent {
            key: Some(key.to_owned()),
            old_value,
            new_value: value.map(str::to_owned),
            source,
        });
        Ok(())
    }

    fn clear(&self, source: ContextId) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.is_empty() {
            return Ok(());
        }
        let previous = std::mem::take(&mut *entries);
        if let Some(backing) = &self.backing
            && let Err(e) = backing.persist(&entries)
        {
            *entries = previous;
            return Err(e);
        }
        let _ = self.events.send(StorageEvent {
            key: None,
            old_value: None,
            new_value: None,
            source,
        });
        Ok(())
    }
}

impl fmt::Debug for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageArea")
            .field("keys", &self.keys())
            .field("file", &self.backing.as_ref().map(FileBacking::path))
            .finish_non_exhaustive()
    }
}

/// One context's view of a [`StorageArea`].
#[derive(Debug, Clone)]
pub struct ContextStorage {
    id: ContextId,
    area: Arc<StorageArea>,
}

impl ContextStorage {
    /// This context's identity.
    #[must_use]
    pub const fn id(&self) -> ContextId {
        self.id
    }

    /// The shared area behind this handle.
    #[must_use]
    pub const fn area(&self) -> &Arc<StorageArea> {
        &self.area
    }

    /// Remove every key in the area.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing file could not be rewritten.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.area.clear(self.id)
    }

    /// Subscribe to changes made by other contexts.
    #[must_use]
    pub fn subscribe(&self) -> StorageEvents {
        StorageEvents {
            own: self.id,
            rx: self.area.events.subscribe(),
        }
    }
}

impl Storage for ContextStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.area.get(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.area.put(self.id, key, Some(value))
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.area.put(self.id, key, None)
    }
}

/// Change notifications from every context except the subscriber's own.
#[derive(Debug)]
pub struct StorageEvents {
    own: ContextId,
    rx: broadcast::Receiver<StorageEvent>,
}

impl StorageEvents {
    /// Wait for the next foreign change. Returns `None` once the area is gone.
    ///
    /// If this subscriber fell behind, a keyless event is returned so the
    /// caller reloads everything it watches.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.source == self.own => {}
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Storage listener lagged, forcing full reload");
                    return Some(StorageEvent::missed());
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Self::recv`]; `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.source == self.own => {}
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    return Some(StorageEvent::missed());
                }
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_share_values() {
        let area = StorageArea::in_memory();
        let a = area.context();
        let b = area.context();

        a.set_item("k", "v").unwrap();
        assert_eq!(b.get_item("k").as_deref(), Some("v"));

        b.remove_item("k").unwrap();
        assert_eq!(a.get_item("k"), None);
    }

    #[test]
    fn test_events_skip_the_writer() {
        let area = StorageArea::in_memory();
        let a = area.context();
        let b = area.context();
        let mut a_events = a.subscribe();
        let mut b_events = b.subscribe();

        a.set_item("k", "1").unwrap();

        assert!(a_events.try_recv().is_none());
        let event = b_events.try_recv().unwrap();
        assert_eq!(event.key.as_deref(), Some("k"));
        assert_eq!(event.old_value, None);
        assert_eq!(event.new_value.as_deref(), Some("1"));
        assert_eq!(event.source, a.id());
    }

    #[test]
    fn test_unchanged_write_fires_nothing() {
        let area = StorageArea::in_memory();
        let a = area.context();
        let mut b_events = area.context().subscribe();

        a.set_item("k", "1").unwrap();
        a.set_item("k", "1").unwrap();
        a.remove_item("missing").unwrap();

        assert!(b_events.try_recv().is_some());
        assert!(b_events.try_recv().is_none());
    }

    #[test]
    fn test_clear_fires_keyless_event() {
        let area = StorageArea::in_memory();
        let a = area.context();
        let mut b_events = area.context().subscribe();
        a.set_item("x", "1").unwrap();
        a.set_item("y", "2").unwrap();
        a.clear().unwrap();

        assert!(area.keys().is_empty());
        let _ = b_events.try_recv();
        let _ = b_events.try_recv();
        let event = b_events.try_recv().unwrap();
        assert_eq!(event.key, None);
        assert!(event.concerns("anything"));
    }

    #[test]
    fn test_lagging_subscriber_gets_keyless_event() {
        let area = StorageArea::in_memory();
        let a = area.context();
        let mut b_events = area.context().subscribe();
        for i in 0..(EVENT_CAPACITY + 10) {
            a.set_item("k", &i.to_string()).unwrap();
        }
        let event = b_events.try_recv().unwrap();
        assert_eq!(event.key, None);
    }

    #[tokio::test]
    async fn test_recv_returns_none_when_area_dropped() {
        let area = StorageArea::in_memory();
        let mut events = area.context().subscribe();
        drop(area);
        assert!(events.recv().await.is_none());
    }

    #[test]
    fn test_file_backed_area_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let area = StorageArea::open(&path).unwrap();
        area.context().set_item("online-shop.cart", "[]").unwrap();
        drop(area);

        let reopened = StorageArea::open(&path).unwrap();
        assert_eq!(
            reopened.context().get_item("online-shop.cart").as_deref(),
            Some("[]")
        );
    }
}
