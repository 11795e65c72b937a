//! Core types for Online Shop.
//!
//! This module provides type-safe wrappers for common domain concepts and the
//! entities shared by every slice.

pub mod cart;
pub mod client;
pub mod email;
pub mod id;
pub mod price;
pub mod product;
pub mod status;
pub mod validation;

pub use cart::CartItem;
pub use client::{Address, Client, ClientDraft};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::Price;
pub use product::{Product, ProductDraft, Rating};
pub use status::ClientStatus;
pub use validation::ValidationError;
