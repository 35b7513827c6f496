//! Storage key list.

use serde::{Deserialize, Serialize};

/// Key the current scripts and downstream consumers read.
pub const PRIMARY_KEY: &str = "turbo_cart";

/// Keys older scripts still read, highest fidelity first.
pub const LEGACY_KEYS: &[&str] = &["cart", "cartItems", "shopping_cart", "checkout_cart"];

/// Ordered list of keys the cart is mirrored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKeys {
    primary: String,
    legacy: Vec<String>,
}

impl StorageKeys {
    /// Create a key list. Legacy entries equal to the primary key or to an
    /// earlier entry are dropped.
    pub fn new(primary: impl Into<String>, legacy: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let primary = primary.into();
        let mut keys: Vec<String> = Vec::new();
        for key in legacy.into_iter().map(Into::into) {
            if key != primary && !keys.contains(&key) {
                keys.push(key);
            }
        }
        Self {
            primary,
            legacy: keys,
        }
    }

    /// The primary key.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Legacy keys in priority order.
    pub fn legacy(&self) -> &[String] {
        &self.legacy
    }

    /// All keys, primary first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.legacy.iter().map(String::as_str))
    }

    /// Number of keys including the primary.
    pub fn len(&self) -> usize {
        1 + self.legacy.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::new(PRIMARY_KEY, LEGACY_KEYS.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        let keys = StorageKeys::default();
        let all: Vec<&str> = keys.iter().collect();
        assert_eq!(
            all,
            vec!["turbo_cart", "cart", "cartItems", "shopping_cart", "checkout_cart"]
        );
        assert_eq!(keys.len(), 5);
    }

    #[test]
    fn test_duplicates_dropped() {
        let keys = StorageKeys::new("cart", ["cart", "old", "old"]);
        let all: Vec<&str> = keys.iter().collect();
        assert_eq!(all, vec!["cart", "old"]);
    }
}
