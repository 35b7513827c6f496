//! Generated item tokens.
//!
//! Items arriving without any usable `sku` or `id` still need a stable key
//! inside the cart. Tokens are already in normalized sku form (lowercase
//! hex behind an `item_` prefix) so normalizing them again is a no-op.

use rand::Rng;

/// Prefix for generated item tokens.
pub const TOKEN_PREFIX: &str = "item_";

/// Generate a new item token.
pub fn generate_token() -> String {
    let bits: u64 = rand::thread_rng().gen();
    format!("{}{:016x}", TOKEN_PREFIX, bits)
}

/// Whether a sku was produced by [`generate_token`].
pub fn is_generated(sku: &str) -> bool {
    sku.strip_prefix(TOKEN_PREFIX)
        .map(|rest| rest.len() == 16 && rest.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_format() {
        let token = generate_token();
        assert!(token.starts_with("item_"));
        assert_eq!(token.len(), 21);
        assert!(is_generated(&token));
    }

    #[test]
    fn test_token_uniqueness() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn test_token_is_normalized() {
        let token = generate_token();
        assert_eq!(crate::normalize_sku(&token), token);
    }

    #[test]
    fn test_plain_sku_is_not_generated() {
        assert!(!is_generated("tee_black"));
        assert!(!is_generated("item_xyz"));
    }
}
