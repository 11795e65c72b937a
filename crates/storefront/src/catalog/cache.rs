//! In-memory memoization of catalog responses.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use online_shop_core::Product;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{CatalogSource, RawUser, RemoteFetchError, paths};

/// Cache key for catalog collections.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum CacheKey {
    Products,
    Categories,
    Users,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Products(Arc<Vec<Product>>),
    Categories(Arc<Vec<String>>),
    Users(Arc<Vec<RawUser>>),
}

/// Wraps a [`CatalogSource`] and keeps successful responses for a fixed TTL.
///
/// Failures are never cached. A zero TTL disables caching entirely.
#[derive(Clone)]
pub struct CachedCatalog<C> {
    inner: C,
    cache: Option<Cache<CacheKey, CacheValue>>,
}

impl<C: CatalogSource> CachedCatalog<C> {
    /// Wrap `inner`, caching for `ttl`.
    #[must_use]
    pub fn new(inner: C, ttl: Duration) -> Self {
        let cache = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(16)
                .time_to_live(ttl)
                .build()
        });
        Self { inner, cache }
    }

    /// The wrapped source.
    #[must_use]
    pub const fn inner(&self) -> &C {
        &self.inner
    }

    /// Drop every cached response.
    pub fn invalidate_all(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }

    async fn cached(&self, key: CacheKey) -> Option<CacheValue> {
        let value = self.cache.as_ref()?.get(&key).await;
        if value.is_some() {
            debug!(?key, "Cache hit for catalog collection");
        }
        value
    }

    async fn store(&self, key: CacheKey, value: CacheValue) {
        if let Some(cache) = &self.cache {
            cache.insert(key, value).await;
        }
    }
}

impl<C: CatalogSource> CatalogSource for CachedCatalog<C> {
    async fn fetch_products(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Product>, RemoteFetchError> {
        if let Some(CacheValue::Products(products)) = self.cached(CacheKey::Products).await {
            return discard_if_cancelled(cancel, paths::PRODUCTS, products.as_ref().clone());
        }
        let products = self.inner.fetch_products(cancel).await?;
        self.store(
            CacheKey::Products,
            CacheValue::Products(Arc::new(products.clone())),
        )
        .await;
        Ok(products)
    }

    async fn fetch_categories(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RemoteFetchError> {
        if let Some(CacheValue::Categories(categories)) = self.cached(CacheKey::Categories).await
        {
            return discard_if_cancelled(cancel, paths::CATEGORIES, categories.as_ref().clone());
        }
        let categories = self.inner.fetch_categories(cancel).await?;
        self.store(
            CacheKey::Categories,
            CacheValue::Categories(Arc::new(categories.clone())),
        )
        .await;
        Ok(categories)
    }

    async fn fetch_users(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawUser>, RemoteFetchError> {
        if let Some(CacheValue::Users(users)) = self.cached(CacheKey::Users).await {
            return discard_if_cancelled(cancel, paths::USERS, users.as_ref().clone());
        }
        let users = self.inner.fetch_users(cancel).await?;
        self.store(CacheKey::Users, CacheValue::Users(Arc::new(users.clone())))
            .await;
        Ok(users)
    }
}

fn discard_if_cancelled<T>(
    cancel: &CancellationToken,
    path: &'static str,
    value: T,
) -> Result<T, RemoteFetchError> {
    if cancel.is_cancelled() {
        Err(RemoteFetchError::Cancelled { path })
    } else {
        Ok(value)
    }
}
