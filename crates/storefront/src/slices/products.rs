//! Custom product slice.
//!
//! Holds only the locally authored products, newest first. Remote products
//! never enter this slice; they are merged in at display time by [`merge`].

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use online_shop_core::{Product, ProductDraft, ProductId};
use tracing::{debug, instrument};

use super::ReloadFromStorage;
use super::entropy::Entropy;
use crate::error::{MutationError, NotFoundError};
use crate::storage::DurableStore;

/// Reducer input for [`ProductsState::reduce`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProductAction {
    /// Replace the whole collection.
    SetAll(Vec<Product>),
    /// Prepend a product.
    Add(Product),
    /// Replace the product with the same id.
    Update(Product),
    /// Drop the product with this id, if present.
    Remove(ProductId),
}

/// In-memory custom products.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductsState {
    items: Vec<Product>,
}

impl ProductsState {
    /// Apply one action.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] for an `Update` whose id is not present; the
    /// state is left untouched.
    pub fn reduce(&mut self, action: ProductAction) -> Result<(), NotFoundError> {
        match action {
            ProductAction::SetAll(items) => self.items = items,
            ProductAction::Add(product) => self.items.insert(0, product),
            ProductAction::Update(product) => {
                let slot = self
                    .items
                    .iter_mut()
                    .find(|p| p.id == product.id)
                    .ok_or(NotFoundError {
                        entity: "product",
                        id: product.id.as_i64(),
                    })?;
                *slot = product;
            }
            ProductAction::Remove(id) => self.items.retain(|p| p.id != id),
        }
        Ok(())
    }

    #[must_use]
    pub fn items(&self) -> &[Product] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.items.iter().find(|p| p.id == id)
    }

    /// Whether `id` belongs to the custom collection.
    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.get(id).is_some()
    }

    fn max_id(&self) -> Option<i64> {
        self.items.iter().map(|p| p.id.as_i64()).max()
    }
}

/// Display order: custom products in stored order, then remote products.
///
/// Ids are not de-duplicated: a custom product that shares an id with a
/// remote one shows up twice.
#[must_use]
pub fn merge(remote: &[Product], custom: &[Product]) -> Vec<Product> {
    custom.iter().chain(remote).cloned().collect()
}

/// Custom product slice bound to its durable record.
pub struct ProductStore {
    state: RwLock<ProductsState>,
    store: DurableStore,
    key: String,
    entropy: Arc<Entropy>,
}

impl ProductStore {
    /// Empty slice persisting under `key`. Call [`Self::load_from_storage`]
    /// to hydrate it.
    #[must_use]
    pub fn new(store: DurableStore, key: impl Into<String>, entropy: Arc<Entropy>) -> Self {
        Self {
            state: RwLock::new(ProductsState::default()),
            store,
            key: key.into(),
            entropy,
        }
    }

    /// Snapshot of the custom products, newest first.
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.read().items.clone()
    }

    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<Product> {
        self.read().get(id).cloned()
    }

    /// Whether `id` is a custom product, and therefore editable.
    #[must_use]
    pub fn is_custom(&self, id: ProductId) -> bool {
        self.read().contains(id)
    }

    /// Replace every custom product. No validation beyond shape.
    pub fn set_all(&self, products: Vec<Product>) {
        self.dispatch(ProductAction::SetAll(products))
            .unwrap_or_else(|_| unreachable!("SetAll cannot miss"));
    }

    /// Validate `draft`, give it a fresh id and an empty rating, and prepend
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Validation`] if the draft breaks a product
    /// rule, or [`MutationError::IdsExhausted`] if no id above the held ones
    /// is left. The slice is unchanged either way.
    #[instrument(skip_all)]
    pub fn add(&self, draft: ProductDraft) -> Result<Product, MutationError> {
        let mut state = self.write();
        let draft = draft.normalized()?;
        if let Some(max) = state.max_id() {
            self.entropy.observe(max);
        }
        let product = Product::from_draft(ProductId::new(self.entropy.next_id()?), draft)?;
        state
            .reduce(ProductAction::Add(product.clone()))
            .unwrap_or_else(|_| unreachable!("Add cannot miss"));
        self.persist(&state);
        debug!(id = %product.id, "Added custom product");
        Ok(product)
    }

    /// Replace the custom product with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::NotFound`] if the id is not a custom product,
    /// or [`MutationError::Validation`] if the edited fields break a product
    /// rule. The slice is unchanged in both cases.
    #[instrument(skip_all, fields(id = %product.id))]
    pub fn update(&self, product: Product) -> Result<Product, MutationError> {
        let mut state = self.write();
        if !state.contains(product.id) {
            return Err(NotFoundError {
                entity: "product",
                id: product.id.as_i64(),
            }
            .into());
        }
        let product = product.validated()?;
        state.reduce(ProductAction::Update(product.clone()))?;
        self.persist(&state);
        Ok(product)
    }

    /// Remove the custom product with `id`. Missing ids are ignored.
    pub fn remove(&self, id: ProductId) {
        self.dispatch(ProductAction::Remove(id))
            .unwrap_or_else(|_| unreachable!("Remove cannot miss"));
    }

    /// Overwrite memory with the durable record. Returns the new count.
    pub fn load_from_storage(&self) -> usize {
        let items: Vec<Product> = self.store.load_collection(&self.key);
        let count = items.len();
        *self.write() = ProductsState { items };
        debug!(key = %self.key, count, "Loaded custom products");
        count
    }

    fn dispatch(&self, action: ProductAction) -> Result<(), NotFoundError> {
        let mut state = self.write();
        state.reduce(action)?;
        self.persist(&state);
        Ok(())
    }

    fn persist(&self, state: &ProductsState) {
        self.store.save_collection(&self.key, &state.items);
    }

    fn read(&self) -> RwLockReadGuard<'_, ProductsState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ProductsState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReloadFromStorage for ProductStore {
    fn reload_from_storage(&self) {
        self.load_from_storage();
    }
}

impl std::fmt::Debug for ProductStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductStore")
            .field("key", &self.key)
            .field("len", &self.read().items.len())
            .finish_non_exhaustive()
    }
}
