//! Cart slice.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use online_shop_core::{CartItem, Price, Product, ProductId};
use tracing::debug;

use super::ReloadFromStorage;
use crate::storage::DurableStore;

/// Cart lines, at most one per product id.
pub struct CartStore {
    items: RwLock<Vec<CartItem>>,
    store: DurableStore,
    key: String,
}

impl CartStore {
    #[must_use]
    pub fn new(store: DurableStore, key: impl Into<String>) -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            store,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.read().clone()
    }

    /// Add one unit of `product`. An existing line keeps its first
    /// snapshot and gains one unit.
    pub fn add_to_cart(&self, product: Product) {
        self.mutate(|items| {
            if let Some(item) = items.iter_mut().find(|i| i.product_id() == product.id) {
                item.quantity = item.quantity.saturating_add(1);
            } else {
                items.push(CartItem::new(product));
            }
        });
    }

    /// Drop the line for `product_id`, if any.
    pub fn remove_from_cart(&self, product_id: ProductId) {
        self.mutate(|items| items.retain(|i| i.product_id() != product_id));
    }

    /// Set the quantity of an existing line. Values below 1 become 1.
    pub fn update_quantity(&self, product_id: ProductId, quantity: i64) {
        let quantity = u32::try_from(quantity.max(1)).unwrap_or(u32::MAX);
        self.mutate(|items| {
            if let Some(item) = items.iter_mut().find(|i| i.product_id() == product_id) {
                item.quantity = quantity;
            }
        });
    }

    pub fn clear(&self) {
        self.mutate(Vec::clear);
    }

    /// Sum of snapshot price times quantity.
    #[must_use]
    pub fn total(&self) -> Price {
        self.read().iter().map(CartItem::line_total).sum()
    }

    /// Sum of quantities, for the badge. Not the number of lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.read().iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Overwrite memory with the durable record. Returns the number of lines.
    pub fn load(&self) -> usize {
        let items: Vec<CartItem> = self.store.load_collection(&self.key);
        let count = items.len();
        *self.write() = items;
        debug!(key = %self.key, count, "Loaded cart");
        count
    }

    fn mutate(&self, f: impl FnOnce(&mut Vec<CartItem>)) {
        let mut items = self.write();
        f(&mut items);
        self.store.save_collection(&self.key, &items);
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<CartItem>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<CartItem>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReloadFromStorage for CartStore {
    fn reload_from_storage(&self) {
        self.load();
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("key", &self.key)
            .field("lines", &self.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use online_shop_core::{ProductDraft, Rating};
    use rust_decimal::Decimal;

    use super::*;
    use crate::storage::StorageArea;

    const KEY: &str = "test.cart";

    fn setup() -> (CartStore, DurableStore) {
        let durable = DurableStore::new(Arc::new(StorageArea::in_memory().context()));
        (CartStore::new(durable.clone(), KEY), durable)
    }

    fn product(id: i64, price: &str) -> Product {
        let mut product = Product::from_draft(
            ProductId::new(id),
            ProductDraft {
                title: format!("Product {id}"),
                description: "Something worth buying".to_string(),
                category: "electronics".to_string(),
                price: Price::new(Decimal::from_str(price).unwrap()),
                image: "https://fakestoreapi.com/img/1.jpg".to_string(),
            },
        )
        .unwrap();
        product.rating = Rating { rate: 4.1, count: 259 };
        product
    }

    #[test]
    fn test_add_twice_increments_one_line() {
        let (cart, _) = setup();
        let p = product(5, "10.0");
        cart.add_to_cart(p.clone());
        cart.add_to_cart(p);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_total_and_count() {
        let (cart, _) = setup();
        cart.add_to_cart(product(5, "10.0"));
        cart.update_quantity(ProductId::new(5), 2);
        cart.add_to_cart(product(7, "3.5"));

        assert_eq!(cart.total(), Price::new(Decimal::from_str("23.5").unwrap()));
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn test_total_uses_snapshot_price() {
        let (cart, _) = setup();
        cart.add_to_cart(product(5, "10.0"));
        // The catalog now charges more; the existing line keeps its snapshot.
        cart.add_to_cart(product(5, "99.0"));

        assert_eq!(cart.total(), Price::new(Decimal::from(20)));
    }

    #[test]
    fn test_update_quantity_clamps_to_one() {
        let (cart, _) = setup();
        cart.add_to_cart(product(5, "10.0"));

        cart.update_quantity(ProductId::new(5), 0);
        assert_eq!(cart.items()[0].quantity, 1);
        cart.update_quantity(ProductId::new(5), -4);
        assert_eq!(cart.items()[0].quantity, 1);
        cart.update_quantity(ProductId::new(5), 250);
        assert_eq!(cart.items()[0].quantity, 250);
    }

    #[test]
    fn test_total_saturates_instead_of_panicking() {
        let (cart, durable) = setup();
        durable.write(
            KEY,
            r#"[{"product":{"id":1,"title":"Yacht","price":1e20,"description":"Rather large boat","category":"boats","image":"https://x/y.png","rating":{"rate":5.0,"count":1}},"quantity":1}]"#,
        );
        assert_eq!(cart.load(), 1);

        cart.update_quantity(ProductId::new(1), 99_999_999_999);
        cart.add_to_cart(product(5, "10.0"));

        assert_eq!(cart.items()[0].quantity, u32::MAX);
        assert_eq!(cart.total(), Price::new(Decimal::MAX));
    }

    #[test]
    fn test_update_quantity_of_missing_line_is_noop() {
        let (cart, _) = setup();
        cart.update_quantity(ProductId::new(5), 3);
        assert!(cart.items().is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let (cart, durable) = setup();
        cart.add_to_cart(product(5, "10.0"));
        cart.add_to_cart(product(7, "3.5"));

        cart.remove_from_cart(ProductId::new(5));
        cart.remove_from_cart(ProductId::new(5));
        assert_eq!(cart.items().len(), 1);

        cart.clear();
        assert!(cart.items().is_empty());
        assert_eq!(cart.total(), Price::ZERO);
        assert_eq!(durable.read(KEY), None);
    }

    #[test]
    fn test_every_mutation_persists() {
        let (cart, durable) = setup();
        cart.add_to_cart(product(5, "10.0"));
        cart.update_quantity(ProductId::new(5), 4);

        let stored: Vec<CartItem> = durable.load_collection(KEY);
        assert_eq!(stored, cart.items());
        assert_eq!(stored[0].quantity, 4);
    }

    #[test]
    fn test_load_restores_cart() {
        let (cart, durable) = setup();
        durable.save_collection(KEY, &[CartItem::new(product(9, "1.25"))]);
        assert_eq!(cart.load(), 1);
        assert_eq!(cart.item_count(), 1);
    }
}
