//! Per-context shop state.
//!
//! One [`ShopState`] plays the role of one open tab: it owns a storage
//! context, the three slices bound to it, the remote catalog view and the
//! sync listener.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use online_shop_core::Product;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::catalog::{CatalogSource, RemoteFetchError, paths};
use crate::config::ShopConfig;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::slices::{CartStore, ClientStore, Entropy, ProductStore, Seeding};
use crate::storage::{ContextId, ContextStorage, DurableStore, StorageKeys};
use crate::sync::{SyncListener, SyncRouter};
use crate::view::{ProductListing, listing};

/// What this context currently knows about the remote catalog.
#[derive(Debug, Clone, Default)]
pub struct RemoteView {
    pub products: Vec<Product>,
    pub categories: Vec<String>,
    pub loading_products: bool,
    pub loading_categories: bool,
    /// Dismissible banner text from the last failed product load.
    pub error: Option<String>,
}

/// Shop state shared by everything running in one context.
///
/// Cheaply cloneable via `Arc`.
pub struct ShopState<C> {
    inner: Arc<ShopStateInner<C>>,
}

struct ShopStateInner<C> {
    config: ShopConfig,
    keys: StorageKeys,
    context: ContextStorage,
    durable: DurableStore,
    catalog: C,
    products: Arc<ProductStore>,
    clients: Arc<ClientStore>,
    cart: Arc<CartStore>,
    remote: RwLock<RemoteView>,
    cancel: CancellationToken,
    listener: Mutex<Option<SyncListener>>,
}

impl<C> Clone for ShopState<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: CatalogSource> ShopState<C> {
    /// Wire slices onto `context`. Nothing is loaded until [`Self::mount`].
    #[must_use]
    pub fn new(
        config: ShopConfig,
        context: ContextStorage,
        catalog: C,
        entropy: Arc<Entropy>,
    ) -> Self {
        let keys = config.storage_keys();
        let durable = DurableStore::new(Arc::new(context.clone()));

        let products = Arc::new(ProductStore::new(
            durable.clone(),
            keys.custom_products.clone(),
            Arc::clone(&entropy),
        ));
        let clients = Arc::new(ClientStore::new(
            durable.clone(),
            keys.clients.clone(),
            entropy,
        ));
        let cart = Arc::new(CartStore::new(durable.clone(), keys.cart.clone()));

        Self {
            inner: Arc::new(ShopStateInner {
                config,
                keys,
                context,
                durable,
                catalog,
                products,
                clients,
                cart,
                remote: RwLock::new(RemoteView::default()),
                cancel: CancellationToken::new(),
                listener: Mutex::new(None),
            }),
        }
    }

    /// Hydrate products and cart from storage and start the sync listener.
    ///
    /// Must be called inside a Tokio runtime. Calling it twice only reloads.
    #[instrument(skip_all, fields(context = %self.inner.context.id()))]
    pub fn mount(&self) {
        self.inner.products.load_from_storage();
        self.inner.cart.load();

        let mut listener = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if listener.is_some() || self.is_torn_down() {
            return;
        }

        let mut router = SyncRouter::new().watch(
            self.inner.keys.custom_products.clone(),
            self.inner.products.clone(),
        );
        if self.inner.config.sync_all_slices {
            router = router
                .watch(self.inner.keys.cart.clone(), self.inner.cart.clone())
                .watch(self.inner.keys.clients.clone(), self.inner.clients.clone());
        }
        *listener = Some(SyncListener::spawn(self.inner.context.subscribe(), router));
    }

    /// Load remote products, serving the cached copy from storage first.
    ///
    /// On failure the previously shown products stay and the error banner is
    /// set. A response that arrives after [`Self::teardown`] is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::RemoteFetch`] when the catalog request fails or
    /// was discarded after teardown.
    #[instrument(skip_all)]
    pub async fn load_products(&self) -> Result<usize> {
        {
            let mut remote = self.remote_mut();
            if remote.products.is_empty() {
                remote.products = self
                    .inner
                    .durable
                    .load_collection(&self.inner.keys.remote_products);
            }
            remote.loading_products = true;
        }

        let fetched = self.inner.catalog.fetch_products(&self.inner.cancel).await;

        if self.is_torn_down() {
            debug!("Dropping product response after teardown");
            return Err(RemoteFetchError::Cancelled {
                path: paths::PRODUCTS,
            }
            .into());
        }

        let mut remote = self.remote_mut();
        remote.loading_products = false;
        match fetched {
            Ok(products) => {
                let count = products.len();
                self.inner
                    .durable
                    .save_collection(&self.inner.keys.remote_products, &products);
                remote.products = products;
                remote.error = None;
                drop(remote);
                add_breadcrumb("catalog", "Loaded remote products", None);
                Ok(count)
            }
            Err(e) => {
                let err = AppError::from(e);
                remote.error = Some(err.user_message());
                drop(remote);
                err.capture();
                Err(err)
            }
        }
    }

    /// Load categories. Any failure yields an empty list and no banner.
    #[instrument(skip_all)]
    pub async fn load_categories(&self) -> Vec<String> {
        self.remote_mut().loading_categories = true;
        let fetched = self.inner.catalog.fetch_categories(&self.inner.cancel).await;
        if self.is_torn_down() {
            return Vec::new();
        }

        let categories = fetched.unwrap_or_else(|e| {
            warn!(error = %e, "Categories unavailable, continuing without them");
            Vec::new()
        });
        let mut remote = self.remote_mut();
        remote.loading_categories = false;
        remote.categories.clone_from(&categories);
        categories
    }

    /// Load products and categories concurrently.
    ///
    /// # Errors
    ///
    /// Returns the product load error; category failures are silent.
    pub async fn load_catalog(&self) -> Result<usize> {
        let (products, _categories) = tokio::join!(self.load_products(), self.load_categories());
        products
    }

    /// Restore clients from storage, seeding from remote users on first run.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::RemoteFetch`] when seeding was needed and failed.
    pub async fn init_clients(&self) -> Result<Seeding> {
        self.inner
            .clients
            .initialize(&self.inner.catalog, &self.inner.cancel)
            .await
            .map_err(AppError::from)
    }

    /// Stop the sync listener and make every in-flight fetch's response be
    /// ignored.
    pub async fn teardown(&self) {
        self.inner.cancel.cancel();
        let listener = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            listener.shutdown().await;
        }
        debug!(context = %self.inner.context.id(), "Shop state torn down");
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Hide the error banner.
    pub fn dismiss_error(&self) {
        self.remote_mut().error = None;
    }

    /// Current error banner, if any.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.remote().error.clone()
    }

    /// Snapshot of the remote view.
    #[must_use]
    pub fn remote_view(&self) -> RemoteView {
        self.remote().clone()
    }

    /// Merged, filtered product listing.
    #[must_use]
    pub fn listing(&self, search: &str) -> Vec<ProductListing> {
        let custom = self.inner.products.products();
        listing(&custom, &self.remote().products, search)
    }

    #[must_use]
    pub fn products(&self) -> &ProductStore {
        &self.inner.products
    }

    #[must_use]
    pub fn clients(&self) -> &ClientStore {
        &self.inner.clients
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn catalog(&self) -> &C {
        &self.inner.catalog
    }

    #[must_use]
    pub fn config(&self) -> &ShopConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn context_id(&self) -> ContextId {
        self.inner.context.id()
    }

    fn remote(&self) -> RwLockReadGuard<'_, RemoteView> {
        self.inner
            .remote
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn remote_mut(&self) -> RwLockWriteGuard<'_, RemoteView> {
        self.inner
            .remote
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C> std::fmt::Debug for ShopState<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopState")
            .field("context", &self.inner.context.id())
            .field("keys", &self.inner.keys)
            .finish_non_exhaustive()
    }
}
