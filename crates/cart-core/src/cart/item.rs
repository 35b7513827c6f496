//! Canonical cart item.

use serde::{Deserialize, Serialize};

use crate::money::line_total;

/// Name used when an item arrives without one.
pub const DEFAULT_NAME: &str = "Product";

/// Category used when an item arrives without one.
pub const DEFAULT_CATEGORY: &str = "general";

/// A canonical cart item.
///
/// Every context reads and writes this shape regardless of which legacy
/// shape the item was first seen in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    /// Stable identifier, derived from the sku.
    pub id: String,
    /// Normalized sku; unique within a cart.
    pub sku: String,
    /// Display name.
    pub name: String,
    /// Unit price, never negative.
    pub price: f64,
    /// Quantity, at least 1.
    pub quantity: u32,
    /// Image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Category tag.
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl CartItem {
    /// Create an item from an already normalized sku.
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price: f64, quantity: u32) -> Self {
        let sku = sku.into();
        Self {
            id: sku.clone(),
            sku,
            name: name.into(),
            price,
            quantity: quantity.max(1),
            image: None,
            category: default_category(),
        }
    }

    /// Set the image URL.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Price times quantity, rounded to cents.
    pub fn line_total(&self) -> f64 {
        line_total(self.price, self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_defaults() {
        let item = CartItem::new("tee_black", "Tee", 19.99, 0);
        assert_eq!(item.id, "tee_black");
        assert_eq!(item.quantity, 1);
        assert_eq!(item.category, "general");
        assert!(item.image.is_none());
    }

    #[test]
    fn test_line_total() {
        let item = CartItem::new("mug", "Mug", 12.5, 3);
        assert_eq!(item.line_total(), 37.5);
    }

    #[test]
    fn test_serialization_skips_missing_image() {
        let item = CartItem::new("mug", "Mug", 12.5, 1);
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("image").is_none());
        assert_eq!(json["category"], "general");
    }
}
