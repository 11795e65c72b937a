//! Product entity shared by the remote catalog and the custom collection.
//!
//! A product looks the same whichever side it came from. Whether it can be
//! edited is decided by the product slice (membership in the custom
//! collection), never by a field on the product itself.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;
use super::validation::{ValidationError, require_min_chars, require_present, require_url};

/// Minimum title length, in characters.
pub const MIN_TITLE_CHARS: usize = 3;
/// Minimum description length, in characters.
pub const MIN_DESCRIPTION_CHARS: usize = 10;

/// Aggregate review score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rating {
    /// Average score between 0 and 5.
    pub rate: f64,
    /// Number of reviews.
    pub count: u32,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Price,
    pub description: String,
    pub category: String,
    /// Image URL.
    pub image: String,
    /// Missing in records written before ratings existed; loads as `{0, 0}`.
    #[serde(default)]
    pub rating: Rating,
}

/// User input for creating or editing a custom product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: Price,
    pub image: String,
}

impl ProductDraft {
    /// Trim every text field and check the draft rules.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the title is shorter than 3
    /// characters, the description shorter than 10, the category is empty,
    /// the price is not positive, or the image is not an absolute URL.
    pub fn normalized(mut self) -> Result<Self, ValidationError> {
        require_min_chars(&mut self.title, "title", MIN_TITLE_CHARS)?;
        require_min_chars(&mut self.description, "description", MIN_DESCRIPTION_CHARS)?;
        require_present(&mut self.category, "category")?;
        if !self.price.is_positive() {
            return Err(ValidationError::NonPositivePrice);
        }
        require_url(&mut self.image, "image")?;
        Ok(self)
    }
}

impl Product {
    /// Build a new custom product with an empty rating.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the draft breaks any rule of
    /// [`ProductDraft::normalized`].
    pub fn from_draft(id: ProductId, draft: ProductDraft) -> Result<Self, ValidationError> {
        let draft = draft.normalized()?;
        Ok(Self {
            id,
            title: draft.title,
            price: draft.price,
            description: draft.description,
            category: draft.category,
            image: draft.image,
            rating: Rating::default(),
        })
    }

    /// The editable fields of this product.
    #[must_use]
    pub fn draft(&self) -> ProductDraft {
        ProductDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            price: self.price,
            image: self.image.clone(),
        }
    }

    /// Re-validate the editable fields, keeping id and rating.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the edited fields break a draft rule.
    pub fn validated(self) -> Result<Self, ValidationError> {
        let rating = self.rating;
        let mut product = Self::from_draft(self.id, self.draft())?;
        product.rating = rating;
        Ok(product)
    }

    /// Case-insensitive title match against an already trimmed, lowercased
    /// search term. An empty term matches everything.
    #[must_use]
    pub fn title_matches(&self, normalized_term: &str) -> bool {
        normalized_term.is_empty() || self.title.to_lowercase().contains(normalized_term)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn shirt() -> ProductDraft {
        ProductDraft {
            title: "Shirt".to_string(),
            description: "A nice cotton shirt".to_string(),
            category: "men".to_string(),
            price: Price::new(Decimal::from(20)),
            image: "https://x/y.png".to_string(),
        }
    }

    #[test]
    fn test_from_draft_defaults_rating() {
        let product = Product::from_draft(ProductId::new(1), shirt()).unwrap();
        assert_eq!(product.rating, Rating { rate: 0.0, count: 0 });
        assert_eq!(product.title, "Shirt");
    }

    #[test]
    fn test_from_draft_trims_fields() {
        let mut draft = shirt();
        draft.title = "  Shirt  ".to_string();
        draft.image = " https://x/y.png ".to_string();
        let product = Product::from_draft(ProductId::new(1), draft).unwrap();
        assert_eq!(product.title, "Shirt");
        assert_eq!(product.image, "https://x/y.png");
    }

    #[test]
    fn test_draft_rules() {
        let mut draft = shirt();
        draft.title = "ab".to_string();
        assert!(matches!(
            draft.normalized(),
            Err(ValidationError::TooShort { field: "title", .. })
        ));

        let mut draft = shirt();
        draft.description = "too short".to_string();
        assert!(matches!(
            draft.normalized(),
            Err(ValidationError::TooShort {
                field: "description",
                ..
            })
        ));

        let mut draft = shirt();
        draft.category = String::new();
        assert_eq!(
            draft.normalized(),
            Err(ValidationError::Required { field: "category" })
        );

        let mut draft = shirt();
        draft.price = Price::ZERO;
        assert_eq!(draft.normalized(), Err(ValidationError::NonPositivePrice));

        let mut draft = shirt();
        draft.image = "y.png".to_string();
        assert!(matches!(
            draft.normalized(),
            Err(ValidationError::InvalidUrl { field: "image", .. })
        ));
    }

    #[test]
    fn test_remote_product_json() {
        let json = r#"{
            "id": 1,
            "title": "Fjallraven - Foldsack No. 1 Backpack, Fits 15 Laptops",
            "price": 109.95,
            "description": "Your perfect pack for everyday use",
            "category": "men's clothing",
            "image": "https://fakestoreapi.com/img/81fPKd-2AYL._AC_SL1500_.jpg",
            "rating": { "rate": 3.9, "count": 120 }
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new(1));
        assert_eq!(product.price.amount(), Decimal::new(10995, 2));
        assert_eq!(product.rating.count, 120);
    }

    #[test]
    fn test_missing_rating_loads_as_zero() {
        let json = r#"{"id":5,"title":"Shirt","price":20,"description":"A nice cotton shirt",
            "category":"men","image":"https://x/y.png"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.rating, Rating::default());
    }

    #[test]
    fn test_validated_keeps_rating() {
        let mut product = Product::from_draft(ProductId::new(3), shirt()).unwrap();
        product.rating = Rating { rate: 4.5, count: 3 };
        product.title = " Shirt v2 ".to_string();
        let product = product.validated().unwrap();
        assert_eq!(product.title, "Shirt v2");
        assert_eq!(product.rating.count, 3);
    }

    #[test]
    fn test_title_matches() {
        let product = Product::from_draft(ProductId::new(1), shirt()).unwrap();
        assert!(product.title_matches(""));
        assert!(product.title_matches("shi"));
        assert!(!product.title_matches("pants"));
    }
}
