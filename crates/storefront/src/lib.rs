//! Online Shop storefront state layer.
//!
//! Reconciles the read-only remote catalog with locally owned records
//! (custom products, clients, cart), keeps them in a durable key-value
//! store, and propagates changes between contexts sharing that store.
//!
//! # Architecture
//!
//! - [`storage`]: shared string store, per-context handles, change events
//! - [`catalog`]: remote catalog client behind the [`catalog::CatalogSource`] seam
//! - [`slices`]: products, clients and cart with their mutation contracts
//! - [`sync`]: reloads slices when another context rewrites their record
//! - [`view`]: merged, searchable product listing
//! - [`state`]: wires all of the above into one context

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
pub mod slices;
pub mod state;
pub mod storage;
pub mod sync;
pub mod view;

pub use config::ShopConfig;
pub use error::{AppError, MutationError, NotFoundError};
pub use state::ShopState;
