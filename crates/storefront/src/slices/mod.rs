//! Entity slices: in-memory state for each locally owned collection.
//!
//! Every slice owns one durable record. Mutations take the slice's write
//! lock, change memory, and save the record before releasing the lock, so a
//! read that follows a mutation in the same context always sees it.

pub mod cart;
pub mod clients;
pub mod entropy;
pub mod products;

pub use cart::CartStore;
pub use clients::{ClientStore, Seeding};
pub use entropy::{Clock, Entropy, FixedClock, IdsExhausted, SystemClock};
pub use products::{ProductAction, ProductStore, ProductsState, merge};

/// A slice that can throw away its memory and re-read its durable record.
///
/// This is what the sync listener calls when another context changed a
/// watched key.
pub trait ReloadFromStorage: Send + Sync {
    fn reload_from_storage(&self);
}
