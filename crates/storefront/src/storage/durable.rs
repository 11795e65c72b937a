//! Typed collection helpers over raw storage.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::Storage;

/// Typed access to durable records.
///
/// Nothing here returns an error: backend failures are logged and dropped,
/// and unreadable records read as empty collections.
#[derive(Clone)]
pub struct DurableStore {
    backend: Arc<dyn Storage>,
}

impl DurableStore {
    /// Wrap a storage backend.
    #[must_use]
    pub fn new(backend: Arc<dyn Storage>) -> Self {
        Self { backend }
    }

    /// Raw value for `key`.
    #[must_use]
    pub fn read(&self, key: &str) -> Option<String> {
        self.backend.get_item(key)
    }

    /// Store a raw value. Last write wins.
    pub fn write(&self, key: &str, raw: &str) {
        if let Err(e) = self.backend.set_item(key, raw) {
            warn!(key, error = %e, "Failed to write durable record");
        }
    }

    /// Remove `key`.
    pub fn clear(&self, key: &str) {
        if let Err(e) = self.backend.remove_item(key) {
            warn!(key, error = %e, "Failed to clear durable record");
        }
    }

    /// Load a JSON array record.
    ///
    /// A missing key, malformed JSON, a non-array value or an element of the
    /// wrong shape all read as an empty collection. The raw value is left in
    /// place so it can still be inspected or recovered.
    #[must_use]
    pub fn load_collection<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let Some(raw) = self.read(key) else {
            return Vec::new();
        };

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Durable record is not valid JSON, treating as empty");
                return Vec::new();
            }
        };

        if !value.is_array() {
            warn!(key, "Durable record is not an array, treating as empty");
            return Vec::new();
        }

        match serde_json::from_value::<Vec<T>>(value) {
            Ok(items) => {
                debug!(key, count = items.len(), "Loaded durable collection");
                items
            }
            Err(e) => {
                warn!(key, error = %e, "Durable record has unexpected shape, treating as empty");
                Vec::new()
            }
        }
    }

    /// Save a collection as a JSON array. An empty collection removes the key,
    /// so "empty" and "never written" look the same to readers.
    pub fn save_collection<T: Serialize>(&self, key: &str, items: &[T]) {
        if items.is_empty() {
            self.clear(key);
            return;
        }

        match serde_json::to_string(items) {
            Ok(raw) => self.write(key, &raw),
            Err(e) => warn!(key, error = %e, "Failed to encode durable collection"),
        }
    }
}

impl fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DurableStore").finish_non_exhaustive()
    }
}
