//! Product listing as shown to the shopper.

use std::collections::HashSet;

use online_shop_core::{Product, ProductId};

use crate::slices::merge;

/// One row of the product listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductListing {
    pub product: Product,
    /// The id belongs to the custom collection, so the entry can be edited
    /// and deleted.
    pub can_manage: bool,
}

/// Merge custom and remote products and keep those whose title contains
/// `search` (trimmed, case-insensitive).
///
/// `can_manage` is membership of the id in `custom`. A remote entry whose id
/// collides with a custom one is therefore manageable too.
#[must_use]
pub fn listing(custom: &[Product], remote: &[Product], search: &str) -> Vec<ProductListing> {
    let term = search.trim().to_lowercase();
    let custom_ids: HashSet<ProductId> = custom.iter().map(|p| p.id).collect();
    merge(remote, custom)
        .into_iter()
        .filter(|product| product.title_matches(&term))
        .map(|product| ProductListing {
            can_manage: custom_ids.contains(&product.id),
            product,
        })
        .collect()
}
