//! Durable key-value storage shared by every context of one profile.
//!
//! # Architecture
//!
//! - [`Storage`] is the raw string-keyed, string-valued interface
//! - [`StorageArea`] is the shared map itself (in memory, optionally written
//!   through to a JSON file); every context opens its own [`ContextStorage`]
//!   handle onto it
//! - [`DurableStore`] adds typed collection helpers with corruption tolerance
//!
//! Writes are synchronous and last-write-wins. Each write that changes a value
//! fires a [`StorageEvent`] to every *other* context subscribed to the area.

mod area;
mod durable;
mod file;

pub use area::{ContextId, ContextStorage, StorageArea, StorageEvent, StorageEvents};
pub use durable::DurableStore;

use thiserror::Error;

/// Errors raised by a storage backend.
///
/// These never escape [`DurableStore`]; they are logged and swallowed there.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file could not be encoded.
    #[error("storage encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Raw string storage, one per execution context.
pub trait Storage: Send + Sync {
    /// Current raw value for `key`, if any.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend could not persist the change.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend could not persist the change.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Durable record names for each owned collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub custom_products: String,
    pub remote_products: String,
    pub clients: String,
    pub cart: String,
}

impl StorageKeys {
    /// Default key prefix.
    pub const DEFAULT_PREFIX: &'static str = "online-shop";

    /// Keys of the form `{prefix}.custom-products`, `{prefix}.cart`, ...
    #[must_use]
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            custom_products: format!("{prefix}.custom-products"),
            remote_products: format!("{prefix}.remote-products"),
            clients: format!("{prefix}.clients"),
            cart: format!("{prefix}.cart"),
        }
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::with_prefix(Self::DEFAULT_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keys() {
        let keys = StorageKeys::default();
        assert_eq!(keys.custom_products, "online-shop.custom-products");
        assert_eq!(keys.remote_products, "online-shop.remote-products");
        assert_eq!(keys.clients, "online-shop.clients");
        assert_eq!(keys.cart, "online-shop.cart");
    }

    #[test]
    fn test_custom_prefix() {
        let keys = StorageKeys::with_prefix("demo");
        assert_eq!(keys.cart, "demo.cart");
    }
}
