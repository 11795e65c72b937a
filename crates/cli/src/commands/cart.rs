//! Cart commands.

use online_shop_core::{CartItem, ProductId};
use online_shop_storefront::{AppError, NotFoundError};

use crate::Shop;

/// Print cart lines, the badge count and the total.
#[allow(clippy::print_stdout)]
pub fn show(shop: &Shop) {
    let cart = shop.cart();
    let items = cart.items();
    if items.is_empty() {
        println!("Cart is empty.");
        return;
    }
    for item in &items {
        print_line(item);
    }
    println!("{} item(s), total {}", cart.item_count(), cart.total());
}

#[allow(clippy::print_stdout)]
fn print_line(item: &CartItem) {
    println!(
        "{:>14}  {:>3} x {:>9} = {:>10}  {}",
        item.product_id(),
        item.quantity,
        item.product.price,
        item.line_total(),
        item.product.title
    );
}

/// Add one unit of a custom or remote product.
pub async fn add(shop: &Shop, product_id: ProductId) -> Result<(), AppError> {
    let product = match shop.products().get(product_id) {
        Some(product) => product,
        None => {
            if let Err(e) = shop.load_products().await {
                tracing::warn!("{}", e.user_message());
            }
            shop.remote_view()
                .products
                .into_iter()
                .find(|p| p.id == product_id)
                .ok_or(NotFoundError {
                    entity: "product",
                    id: product_id.as_i64(),
                })?
        }
    };
    tracing::info!(id = %product.id, title = %product.title, "Added to cart");
    shop.cart().add_to_cart(product);
    Ok(())
}

pub fn remove(shop: &Shop, product_id: ProductId) {
    shop.cart().remove_from_cart(product_id);
}

pub fn set_quantity(shop: &Shop, product_id: ProductId, quantity: i64) {
    shop.cart().update_quantity(product_id, quantity);
}

pub fn clear(shop: &Shop) {
    shop.cart().clear();
    tracing::info!("Cart cleared");
}
