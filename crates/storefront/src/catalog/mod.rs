//! Remote catalog: read-only products, categories and users.
//!
//! # Architecture
//!
//! - [`CatalogSource`] is the seam every consumer depends on
//! - [`CatalogClient`] implements it over HTTP with `reqwest`; it holds no
//!   state beyond the HTTP client and the base URL
//! - [`CachedCatalog`] is an optional caller-side decorator that memoizes
//!   successful responses in memory via `moka`
//!
//! Nothing in this module writes to durable storage and nothing retries;
//! both are the caller's decision.
//!
//! # Cancellation
//!
//! Every call takes a [`CancellationToken`]. The HTTP request itself is not
//! aborted, but a response that lands after the token was cancelled is
//! discarded and reported as [`RemoteFetchError::Cancelled`].

mod cache;
mod client;

pub use cache::CachedCatalog;
pub use client::CatalogClient;

use std::future::Future;

use online_shop_core::Product;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Paths on the remote catalog.
pub mod paths {
    pub const PRODUCTS: &str = "/products";
    pub const CATEGORIES: &str = "/products/categories";
    pub const USERS: &str = "/users";
}

/// A remote catalog request failed. Never fatal: callers keep whatever state
/// they already had.
#[derive(Debug, Error)]
pub enum RemoteFetchError {
    /// The request could not be sent or the body could not be read.
    #[error("catalog request to {path} failed: {source}")]
    Transport {
        path: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The catalog answered with a non-success status.
    #[error("catalog API error: {status} {reason} ({path})")]
    Status {
        path: &'static str,
        status: u16,
        reason: String,
    },

    /// The body was not the expected JSON.
    #[error("catalog response from {path} could not be decoded: {source}")]
    Decode {
        path: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The response arrived after the caller cancelled.
    #[error("catalog response from {path} discarded after cancellation")]
    Cancelled { path: &'static str },
}

impl RemoteFetchError {
    /// HTTP status, when the catalog answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            Self::Decode { .. } | Self::Cancelled { .. } => None,
        }
    }

    /// Whether this error only reports a discarded stale response.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// A user as served by the remote catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUser {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub username: String,
    pub name: RawUserName,
    pub address: RawUserAddress,
    pub phone: String,
}

/// Nested name of a [`RawUser`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUserName {
    pub firstname: String,
    pub lastname: String,
}

/// Nested address of a [`RawUser`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUserAddress {
    pub city: String,
    pub street: String,
    /// A JSON number upstream; kept loose.
    pub number: serde_json::Value,
    #[serde(default)]
    pub zipcode: String,
    #[serde(default)]
    pub geolocation: Option<Geolocation>,
}

impl RawUserAddress {
    /// House number as text, whatever JSON type it arrived as.
    #[must_use]
    pub fn number_text(&self) -> String {
        match &self.number {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Coordinates attached to a remote user address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geolocation {
    pub lat: String,
    pub long: String,
}

/// Read-only access to the remote catalog.
pub trait CatalogSource: Send + Sync {
    /// `GET /products`.
    fn fetch_products(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<Product>, RemoteFetchError>> + Send;

    /// `GET /products/categories`.
    fn fetch_categories(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<String>, RemoteFetchError>> + Send;

    /// `GET /users`.
    fn fetch_users(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<RawUser>, RemoteFetchError>> + Send;
}
