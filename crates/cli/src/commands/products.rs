//! Product commands.

use online_shop_core::{Price, ProductDraft, ProductId};
use online_shop_storefront::AppError;
use online_shop_storefront::error::add_breadcrumb;
use online_shop_storefront::view::ProductListing;

use crate::Shop;

/// Fields to change on a custom product; `None` keeps the current value.
#[derive(Debug, Default)]
pub struct ProductEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Price>,
    pub image: Option<String>,
}

impl ProductEdit {
    fn apply(self, draft: &mut ProductDraft) {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(category) = self.category {
            draft.category = category;
        }
        if let Some(price) = self.price {
            draft.price = price;
        }
        if let Some(image) = self.image {
            draft.image = image;
        }
    }
}

/// Print the merged listing.
///
/// A failed remote load still lists the custom and cached products.
pub async fn list(shop: &Shop, search: &str) -> Result<(), AppError> {
    if let Err(e) = shop.load_products().await {
        tracing::warn!("{}", e.user_message());
    }
    print_listing(&shop.listing(search));
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_listing(rows: &[ProductListing]) {
    if rows.is_empty() {
        println!("No products found.");
        return;
    }
    for row in rows {
        let marker = if row.can_manage { "*" } else { " " };
        println!(
            "{marker} {:>14}  {:>9}  {:<18}  {}",
            row.product.id, row.product.price, row.product.category, row.product.title
        );
    }
    println!("(* = custom, editable)");
}

/// Create a custom product.
pub fn add(shop: &Shop, draft: ProductDraft) -> Result<(), AppError> {
    let product = shop.products().add(draft)?;
    let id = product.id.to_string();
    add_breadcrumb(
        "products",
        "Created custom product",
        Some(&[("product_id", id.as_str())][..]),
    );
    tracing::info!(id = %product.id, title = %product.title, "Product created");
    Ok(())
}

/// Edit a custom product. Remote products cannot be edited.
pub fn update(shop: &Shop, id: ProductId, edit: ProductEdit) -> Result<(), AppError> {
    let mut product = shop.products().get(id).ok_or(
        online_shop_storefront::NotFoundError {
            entity: "product",
            id: id.as_i64(),
        },
    )?;
    let mut draft = product.draft();
    edit.apply(&mut draft);
    product.title = draft.title;
    product.description = draft.description;
    product.category = draft.category;
    product.price = draft.price;
    product.image = draft.image;

    let product = shop.products().update(product)?;
    tracing::info!(id = %product.id, "Product updated");
    Ok(())
}

/// Delete a custom product. Unknown ids are ignored.
pub fn remove(shop: &Shop, id: ProductId) {
    shop.products().remove(id);
    tracing::info!(%id, "Product removed");
}

/// Print the remote categories, or nothing if they are unavailable.
#[allow(clippy::print_stdout)]
pub async fn categories(shop: &Shop) {
    for category in shop.load_categories().await {
        println!("{category}");
    }
}
