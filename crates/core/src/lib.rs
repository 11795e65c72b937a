//! Online Shop Core - Shared entity types.
//!
//! This crate provides the entity types used across the Online Shop components:
//! - `storefront` - Storage, catalog client, entity slices and cross-context sync
//! - `cli` - Command-line front end over the storefront layer
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no storage
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, statuses and the product,
//!   client and cart entities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
