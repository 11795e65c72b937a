//! Integration tests for Online Shop.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p online-shop-integration-tests
//! ```
//!
//! No network access is needed: [`StubCatalog`] serves a small copy of the
//! remote catalog on an ephemeral local port.
//!
//! # Test Categories
//!
//! - `catalog_client` - HTTP client against the stub server
//! - `cross_context_sync` - several contexts sharing one durable store
//! - `client_seeding` - first-run client seeding and file persistence

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// Counters and failure switches shared with the running stub.
#[derive(Debug, Default)]
pub struct StubControl {
    pub product_hits: AtomicUsize,
    pub category_hits: AtomicUsize,
    pub user_hits: AtomicUsize,
    /// Answer `/products` with 503.
    pub fail_products: AtomicBool,
    /// Answer `/products/categories` with 500.
    pub fail_categories: AtomicBool,
    /// Answer `/products` with a body that is not JSON.
    pub garble_products: AtomicBool,
}

/// A local stand-in for the remote catalog API.
#[derive(Debug)]
pub struct StubCatalog {
    pub addr: SocketAddr,
    base_url: Url,
    pub control: Arc<StubControl>,
    handle: JoinHandle<()>,
}

impl StubCatalog {
    /// Bind to `127.0.0.1:0` and start serving.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the listener cannot be bound.
    pub async fn spawn() -> std::io::Result<Self> {
        let control = Arc::new(StubControl::default());
        let app = Router::new()
            .route("/products", get(products))
            .route("/products/categories", get(categories))
            .route("/users", get(users))
            .with_state(Arc::clone(&control));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let base_url = Url::parse(&format!("http://{addr}")).map_err(std::io::Error::other)?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            base_url,
            control,
            handle,
        })
    }

    /// Base URL to hand to the catalog client.
    #[must_use]
    pub fn base_url(&self) -> Url {
        self.base_url.clone()
    }
}

impl Drop for StubCatalog {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn products(State(control): State<Arc<StubControl>>) -> Response {
    control.product_hits.fetch_add(1, Ordering::SeqCst);
    if control.fail_products.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response();
    }
    if control.garble_products.load(Ordering::SeqCst) {
        return (StatusCode::OK, "<html>not json</html>").into_response();
    }
    Json(sample_products()).into_response()
}

async fn categories(State(control): State<Arc<StubControl>>) -> Response {
    control.category_hits.fetch_add(1, Ordering::SeqCst);
    if control.fail_categories.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(json!(["electronics", "jewelery", "men's clothing", "women's clothing"])).into_response()
}

async fn users(State(control): State<Arc<StubControl>>) -> Json<Value> {
    control.user_hits.fetch_add(1, Ordering::SeqCst);
    Json(sample_users())
}

/// Two products in the remote catalog's wire format.
#[must_use]
pub fn sample_products() -> Value {
    json!([
        {
            "id": 1,
            "title": "Fjallraven - Foldsack No. 1 Backpack, Fits 15 Laptops",
            "price": 109.95,
            "description": "Your perfect pack for everyday use and walks in the forest.",
            "category": "men's clothing",
            "image": "https://fakestoreapi.com/img/81fPKd-2AYL._AC_SL1500_.jpg",
            "rating": { "rate": 3.9, "count": 120 }
        },
        {
            "id": 2,
            "title": "Mens Casual Premium Slim Fit T-Shirts",
            "price": 22.3,
            "description": "Slim-fitting style, contrast raglan long sleeve.",
            "category": "men's clothing",
            "image": "https://fakestoreapi.com/img/71-3HjGNDUL._AC_SY879._SX._UX._SY._UY_.jpg",
            "rating": { "rate": 4.1, "count": 259 }
        }
    ])
}

/// Three users in the remote catalog's wire format.
#[must_use]
pub fn sample_users() -> Value {
    json!([
        {
            "address": {
                "geolocation": { "lat": "-37.3159", "long": "81.1496" },
                "city": "kilcoole",
                "street": "new road",
                "number": 7682,
                "zipcode": "12926-3874"
            },
            "id": 1,
            "email": "john@gmail.com",
            "username": "johnd",
            "password": "m38rmF$",
            "name": { "firstname": "john", "lastname": "doe" },
            "phone": "1-570-236-7033",
            "__v": 0
        },
        {
            "address": {
                "geolocation": { "lat": "-37.3159", "long": "81.1496" },
                "city": "kilcoole",
                "street": "Lovers Ln",
                "number": 7267,
                "zipcode": "12926-3874"
            },
            "id": 2,
            "email": "morrison@gmail.com",
            "username": "mor_2314",
            "password": "83r5^_",
            "name": { "firstname": "david", "lastname": "morrison" },
            "phone": "1-570-236-7033",
            "__v": 0
        },
        {
            "address": {
                "geolocation": { "lat": "40.3467", "long": "-30.1310" },
                "city": "Cullman",
                "street": "Frances Ct",
                "number": 86,
                "zipcode": "29567-1452"
            },
            "id": 3,
            "email": "kevin@gmail.com",
            "username": "kevinryan",
            "password": "kev02937@",
            "name": { "firstname": "kevin", "lastname": "ryan" },
            "phone": "1-567-094-1345",
            "__v": 0
        }
    ])
}
