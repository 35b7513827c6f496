//! Cart type.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::CartItem;
use crate::error::CartError;
use crate::money::round_cents;

/// Maximum quantity allowed per item.
pub const MAX_QUANTITY_PER_ITEM: u32 = 9999;

/// A shopping cart held by one browsing context.
///
/// Items are kept in insertion order and are unique by sku. Aggregates are
/// derived on read, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    /// Items in the cart.
    pub items: Vec<CartItem>,
    /// Time of last mutation.
    pub timestamp: DateTime<Utc>,
    /// Which context last wrote the cart.
    pub source: String,
}

impl Cart {
    /// Create an empty cart owned by `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            timestamp: Utc::now(),
            source: source.into(),
        }
    }

    /// Create an empty cart that was never mutated.
    ///
    /// Its timestamp is the Unix epoch, so any real update is newer.
    pub fn pristine(source: impl Into<String>) -> Self {
        Self {
            timestamp: DateTime::<Utc>::default(),
            ..Self::new(source)
        }
    }

    /// Create a cart from items, folding duplicate skus.
    pub fn from_items(items: Vec<CartItem>, source: impl Into<String>) -> Self {
        let mut cart = Self::new(source);
        for item in items {
            cart.add_item(item);
        }
        cart
    }

    /// Override the timestamp.
    pub fn stamped_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Add an item to the cart.
    ///
    /// An existing entry with the same sku has its quantity increased
    /// (capped at [`MAX_QUANTITY_PER_ITEM`]) instead of gaining a second row.
    /// Returns the resulting quantity for that sku.
    pub fn add_item(&mut self, item: CartItem) -> u32 {
        let quantity = match self.items.iter_mut().find(|i| i.sku == item.sku) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .saturating_add(item.quantity)
                    .min(MAX_QUANTITY_PER_ITEM);
                existing.quantity
            }
            None => {
                let mut item = item;
                item.quantity = item.quantity.clamp(1, MAX_QUANTITY_PER_ITEM);
                let quantity = item.quantity;
                self.items.push(item);
                quantity
            }
        };
        self.touch();
        quantity
    }

    /// Set the quantity of an item.
    ///
    /// A quantity of zero removes the item.
    pub fn set_quantity(&mut self, sku: &str, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return if self.remove_item(sku) {
                Ok(())
            } else {
                Err(CartError::ItemNotInCart(sku.to_string()))
            };
        }

        let item = self
            .items
            .iter_mut()
            .find(|i| i.sku == sku)
            .ok_or_else(|| CartError::ItemNotInCart(sku.to_string()))?;
        item.quantity = quantity.min(MAX_QUANTITY_PER_ITEM);
        self.touch();
        Ok(())
    }

    /// Remove an item from the cart.
    pub fn remove_item(&mut self, sku: &str) -> bool {
        let len_before = self.items.len();
        self.items.retain(|i| i.sku != sku);
        let removed = self.items.len() < len_before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Clear all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
        self.touch();
    }

    /// Get an item by sku.
    pub fn get(&self, sku: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.sku == sku)
    }

    /// Σ price × quantity, rounded to cents.
    pub fn total_amount(&self) -> f64 {
        round_cents(self.items.iter().map(CartItem::line_total).sum())
    }

    /// Σ quantity.
    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Number of distinct skus.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Record a mutation.
    ///
    /// The timestamp strictly increases, even when the clock has not moved
    /// since the previous mutation.
    pub fn touch(&mut self) {
        let next = self.timestamp + Duration::nanoseconds(1);
        self.timestamp = Utc::now().max(next);
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new("unknown")
    }
}
