//! Several contexts sharing one durable store.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use online_shop_core::{Price, Product, ProductDraft};
use online_shop_integration_tests::StubCatalog;
use online_shop_storefront::catalog::{CachedCatalog, CatalogClient};
use online_shop_storefront::slices::{Entropy, FixedClock};
use online_shop_storefront::storage::{Storage, StorageArea, StorageKeys};
use online_shop_storefront::{ShopConfig, ShopState};
use rust_decimal::Decimal;

type Shop = ShopState<CachedCatalog<CatalogClient>>;

fn config(stub: &StubCatalog, sync_all_slices: bool) -> ShopConfig {
    let mut config = ShopConfig::default();
    config.catalog.base_url = stub.base_url();
    config.catalog.cache_ttl = Duration::ZERO;
    config.sync_all_slices = sync_all_slices;
    config
}

fn open(area: &Arc<StorageArea>, config: ShopConfig, seed: u64) -> Shop {
    let client = CatalogClient::new(&config.catalog).unwrap();
    let catalog = CachedCatalog::new(client, config.catalog.cache_ttl);
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    let shop = ShopState::new(
        config,
        area.context(),
        catalog,
        Arc::new(Entropy::seeded(Arc::new(clock), seed)),
    );
    shop.mount();
    shop
}

fn shirt() -> ProductDraft {
    ProductDraft {
        title: "Shirt".to_string(),
        description: "A nice cotton shirt".to_string(),
        category: "men".to_string(),
        price: Price::new(Decimal::from(20)),
        image: "https://x/y.png".to_string(),
    }
}

async fn eventually(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_custom_product_mutations_propagate() {
    let stub = StubCatalog::spawn().await.unwrap();
    let area = StorageArea::in_memory();
    let tab_a = open(&area, config(&stub, false), 1);
    let tab_b = open(&area, config(&stub, false), 2);

    let added = tab_a.products().add(shirt()).unwrap();
    eventually(|| tab_b.products().is_custom(added.id)).await;

    let mut edited = added.clone();
    edited.title = "Linen shirt".to_string();
    tab_b.products().update(edited).unwrap();
    eventually(|| {
        tab_a
            .products()
            .get(added.id)
            .is_some_and(|p| p.title == "Linen shirt")
    })
    .await;

    tab_a.products().remove(added.id);
    eventually(|| tab_b.products().products().is_empty()).await;

    tab_a.teardown().await;
    tab_b.teardown().await;
}

#[tokio::test]
async fn test_merged_listing_marks_custom_entries() {
    let stub = StubCatalog::spawn().await.unwrap();
    let area = StorageArea::in_memory();
    let shop = open(&area, config(&stub, false), 1);

    shop.products().add(shirt()).unwrap();
    shop.load_catalog().await.unwrap();

    let rows = shop.listing("");
    assert_eq!(rows.len(), 3);
    assert!(rows[0].can_manage);
    assert!(rows[1..].iter().all(|r| !r.can_manage));
    assert_eq!(shop.listing("  SLIM fit ").len(), 1);
    assert_eq!(shop.remote_view().categories.len(), 4);

    shop.teardown().await;
}

#[tokio::test]
async fn test_cart_sync_is_opt_in() {
    let stub = StubCatalog::spawn().await.unwrap();
    let product: Product = serde_json::from_value(
        online_shop_integration_tests::sample_products()[0].clone(),
    )
    .unwrap();

    // Default: only custom products are watched.
    let area = StorageArea::in_memory();
    let tab_a = open(&area, config(&stub, false), 1);
    let tab_b = open(&area, config(&stub, false), 2);
    tab_a.cart().add_to_cart(product.clone());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(tab_b.cart().items().is_empty());
    tab_a.teardown().await;
    tab_b.teardown().await;

    // Opted in: the cart follows too.
    let area = StorageArea::in_memory();
    let tab_a = open(&area, config(&stub, true), 1);
    let tab_b = open(&area, config(&stub, true), 2);
    tab_a.cart().add_to_cart(product.clone());
    tab_a.cart().add_to_cart(product);
    eventually(|| tab_b.cart().item_count() == 2).await;
    assert_eq!(tab_b.cart().items().len(), 1);
    tab_a.teardown().await;
    tab_b.teardown().await;
}

#[tokio::test]
async fn test_foreign_corruption_reads_as_empty() {
    let stub = StubCatalog::spawn().await.unwrap();
    let area = StorageArea::in_memory();
    let shop = open(&area, config(&stub, false), 1);
    shop.products().add(shirt()).unwrap();

    let key = StorageKeys::default().custom_products;
    let intruder = area.context();
    intruder.set_item(&key, "{definitely not an array").unwrap();

    eventually(|| shop.products().products().is_empty()).await;
    assert_eq!(
        intruder.get_item(&key).as_deref(),
        Some("{definitely not an array")
    );

    shop.teardown().await;
}

#[tokio::test]
async fn test_clearing_the_area_reloads_every_watched_slice() {
    let stub = StubCatalog::spawn().await.unwrap();
    let area = StorageArea::in_memory();
    let shop = open(&area, config(&stub, true), 1);
    shop.products().add(shirt()).unwrap();
    let product = shop.products().products()[0].clone();
    shop.cart().add_to_cart(product);

    area.context().clear().unwrap();

    eventually(|| shop.products().products().is_empty() && shop.cart().items().is_empty()).await;
    shop.teardown().await;
}
