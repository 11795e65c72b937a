//! HTTP implementation of the remote catalog.

use std::sync::Arc;

use online_shop_core::Product;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use super::{CatalogSource, RawUser, RemoteFetchError, paths};
use crate::config::CatalogConfig;

/// Client for the remote catalog API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl CatalogClient {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be built (for
    /// example, no TLS backend is available).
    pub fn new(config: &CatalogConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("online-shop/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Full URL for a catalog path. Any path prefix on the base is kept.
    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url.as_str().trim_end_matches('/'))
    }

    /// Perform one GET and decode the JSON body.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &'static str,
        cancel: &CancellationToken,
    ) -> Result<T, RemoteFetchError> {
        let url = self.endpoint(path);

        let response = self
            .inner
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|source| RemoteFetchError::Transport { path, source })?;

        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response
            .text()
            .await
            .map_err(|source| RemoteFetchError::Transport { path, source })?;

        if cancel.is_cancelled() {
            debug!(path, "Discarding catalog response after cancellation");
            return Err(RemoteFetchError::Cancelled { path });
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                path,
                body = %body.chars().take(500).collect::<String>(),
                "Catalog API returned non-success status"
            );
            return Err(RemoteFetchError::Status {
                path,
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        serde_json::from_str(&body).map_err(|source| {
            tracing::error!(
                error = %source,
                path,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse catalog response"
            );
            RemoteFetchError::Decode { path, source }
        })
    }
}

impl CatalogSource for CatalogClient {
    #[instrument(skip_all)]
    async fn fetch_products(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Product>, RemoteFetchError> {
        let products: Vec<Product> = self.get(paths::PRODUCTS, cancel).await?;
        debug!(count = products.len(), "Fetched remote products");
        Ok(products)
    }

    #[instrument(skip_all)]
    async fn fetch_categories(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RemoteFetchError> {
        self.get(paths::CATEGORIES, cancel).await
    }

    #[instrument(skip_all)]
    async fn fetch_users(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawUser>, RemoteFetchError> {
        let users: Vec<RawUser> = self.get(paths::USERS, cancel).await?;
        debug!(count = users.len(), "Fetched remote users");
        Ok(users)
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}
