//! Cart line type.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;
use super::product::Product;

/// One cart line: a snapshot of the product taken when it was first added,
/// plus a quantity of at least 1.
///
/// The snapshot is deliberate: a later price change in the catalog must not
/// change what is already in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    /// A fresh line with quantity 1.
    #[must_use]
    pub const fn new(product: Product) -> Self {
        Self {
            product,
            quantity: 1,
        }
    }

    /// The product this line refers to.
    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.product.id
    }

    /// Snapshot price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price * self.quantity
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::types::product::Rating;

    #[test]
    fn test_line_total_uses_snapshot_price() {
        let item = CartItem {
            product: Product {
                id: ProductId::new(5),
                title: "Mug".to_string(),
                price: Price::new(Decimal::from(10)),
                description: "A ceramic mug".to_string(),
                category: "home".to_string(),
                image: "https://x/mug.png".to_string(),
                rating: Rating::default(),
            },
            quantity: 2,
        };
        assert_eq!(item.line_total().amount(), Decimal::from(20));
        assert_eq!(item.product_id(), ProductId::new(5));
    }
}
