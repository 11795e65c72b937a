//! Command implementations, one module per entity family.

pub mod cart;
pub mod clients;
pub mod products;
