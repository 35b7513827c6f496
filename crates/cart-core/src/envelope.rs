//! Persisted cart envelope.
//!
//! This is the shape written under every storage key and carried in
//! `push-cart-data` messages. Downstream consumers (order automation,
//! analytics) read only this shape from the primary key, so its field names
//! are part of the external contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cart::Cart;
use crate::error::CartError;
use crate::normalize::{extract_timestamp, normalize_value};

/// On-disk and on-wire cart wrapper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedEnvelope {
    pub items: Vec<crate::CartItem>,
    pub timestamp: DateTime<Utc>,
    pub total_amount: f64,
    pub total_items: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl PersistedEnvelope {
    /// Snapshot a cart, recomputing aggregates.
    pub fn from_cart(cart: &Cart) -> Self {
        Self {
            items: cart.items.clone(),
            timestamp: cart.timestamp,
            total_amount: cart.total_amount(),
            total_items: cart.total_items(),
            source: Some(cart.source.clone()),
        }
    }

    /// Serialize to the JSON string stored under each key.
    pub fn to_json(&self) -> Result<String, CartError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rebuild a cart. Aggregates stored in the envelope are ignored and
    /// recomputed from the items.
    pub fn into_cart(self) -> Cart {
        let source = self.source.unwrap_or_else(|| "storage".to_string());
        Cart::from_items(self.items, source).stamped_at(self.timestamp)
    }
}

impl Cart {
    /// Leniently parse a cart from any known stored or wire shape.
    ///
    /// Returns `None` when the value holds no recognizable item list.
    /// Items are normalized, so legacy shapes are accepted. A missing or
    /// unparseable timestamp is treated as "now".
    pub fn from_value(value: &Value, source: impl Into<String>) -> Option<Cart> {
        let items = normalize_value(value)?;
        let timestamp = extract_timestamp(value).unwrap_or_else(Utc::now);
        Some(Cart::from_items(items, source).stamped_at(timestamp))
    }

    /// Parse a stored JSON string.
    pub fn from_json(raw: &str, source: impl Into<String>) -> Result<Option<Cart>, CartError> {
        let value: Value = serde_json::from_str(raw)?;
        Ok(Cart::from_value(&value, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CartItem;
    use serde_json::json;

    #[test]
    fn test_envelope_field_names() {
        let mut cart = Cart::new("host");
        cart.add_item(CartItem::new("a", "A", 10.0, 2));

        let json = serde_json::to_value(PersistedEnvelope::from_cart(&cart)).unwrap();
        assert_eq!(json["totalAmount"], 20.0);
        assert_eq!(json["totalItems"], 2);
        assert_eq!(json["items"][0]["sku"], "a");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_envelope_into_cart_preserves_timestamp() {
        let mut cart = Cart::new("host");
        cart.add_item(CartItem::new("a", "A", 10.0, 2));

        let restored = PersistedEnvelope::from_cart(&cart).into_cart();
        assert_eq!(restored, cart);
    }

    #[test]
    fn test_from_value_legacy_array() {
        let value = json!([{ "id": "A-1", "price": "5", "quantity": "2" }]);
        let cart = Cart::from_value(&value, "legacy").unwrap();
        assert_eq!(cart.get("a_1").unwrap().quantity, 2);
        assert_eq!(cart.total_amount(), 10.0);
    }

    #[test]
    fn test_from_value_rejects_unknown_shape() {
        assert!(Cart::from_value(&json!({ "foo": 1 }), "x").is_none());
        assert!(Cart::from_value(&json!("text"), "x").is_none());
    }

    #[test]
    fn test_from_json_malformed() {
        assert!(Cart::from_json("{not json", "x").is_err());
    }
}
