//! Handoff URL contract.
//!
//! `<payment page>?cart=<url-encoded JSON array of items>&t=<epoch ms>`
//!
//! The `t` parameter is a cache-buster and is always present. Components are
//! percent-encoded with `%20` for spaces, so both `decodeURIComponent` and
//! form-style decoders read the same JSON.

use cart_core::{normalize_value, CartItem};
use serde_json::Value;
use url::Url;

use crate::error::CheckoutError;

const CART_PARAM: &str = "cart";
const CACHE_BUST_PARAM: &str = "t";

/// Build the payment page URL carrying the cart.
///
/// Query parameters already on `base` are kept, except stale `cart`/`t`
/// values which are replaced.
pub fn build_handoff_url(base: &str, items: &[CartItem], epoch_ms: i64) -> Result<String, CheckoutError> {
    let mut url = Url::parse(base).map_err(|e| CheckoutError::InvalidPaymentUrl(format!("{base}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(CheckoutError::InvalidPaymentUrl(base.to_string()));
    }

    let cart = serde_json::to_string(items).map_err(|e| CheckoutError::InvalidCartParam(e.to_string()))?;

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != CART_PARAM && k != CACHE_BUST_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.push((CART_PARAM.to_string(), cart));
    pairs.push((CACHE_BUST_PARAM.to_string(), epoch_ms.to_string()));

    let query = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&");
    url.set_query(Some(&query));

    Ok(url.into())
}

/// Percent-encode a query component the way `encodeURIComponent` decodes
/// it: spaces become `%20`, never `+`.
fn encode_component(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Decode the cart carried by a handoff URL.
///
/// Used by the payment page to seed its own cart. Items are normalized, so
/// URLs produced by older scripts are accepted too.
pub fn parse_handoff_url(url: &str) -> Result<Vec<CartItem>, CheckoutError> {
    let url = Url::parse(url).map_err(|e| CheckoutError::InvalidPaymentUrl(e.to_string()))?;
    let raw = url
        .query_pairs()
        .find(|(k, _)| k == CART_PARAM)
        .map(|(_, v)| v.into_owned())
        .ok_or(CheckoutError::MissingCartParam)?;

    let value: Value = serde_json::from_str(&raw).map_err(|e| CheckoutError::InvalidCartParam(e.to_string()))?;
    normalize_value(&value).ok_or_else(|| CheckoutError::InvalidCartParam("no item list".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<CartItem> {
        vec![
            CartItem::new("tee_black", "Tee & Co / \"Black\"", 19.99, 2),
            CartItem::new("mug", "Mug", 8.0, 1).with_image("https://cdn.test/m.png?s=1"),
        ]
    }

    #[test]
    fn test_url_shape() {
        let url = build_handoff_url("https://pay.example.com/checkout", &items(), 1_700_000_000_123).unwrap();
        assert!(url.starts_with("https://pay.example.com/checkout?cart="));
        assert!(url.ends_with("&t=1700000000123"));
        assert!(!url.contains('"'));
        assert!(!url.contains(' '));
    }

    #[test]
    fn test_spaces_are_percent_encoded() {
        let items = vec![CartItem::new("tee", "Blue Tee + Cap", 10.0, 1)];
        let url = build_handoff_url("https://pay.example.com/checkout", &items, 1).unwrap();

        let query = url.split_once('?').unwrap().1;
        assert!(query.contains("Blue%20Tee%20%2B%20Cap"));
        assert!(!query.contains('+'));
        assert_eq!(parse_handoff_url(&url).unwrap(), items);
    }

    #[test]
    fn test_roundtrip() {
        let url = build_handoff_url("https://pay.example.com/checkout", &items(), 1).unwrap();
        assert_eq!(parse_handoff_url(&url).unwrap(), items());
    }

    #[test]
    fn test_existing_query_kept_and_stale_cart_replaced() {
        let base = "https://pay.example.com/checkout?store=br&cart=old&t=1";
        let url = build_handoff_url(base, &items(), 42).unwrap();

        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("store".to_string(), "br".to_string()));
        assert_eq!(pairs.iter().filter(|(k, _)| k == "cart").count(), 1);
        assert_eq!(pairs.last().unwrap(), &("t".to_string(), "42".to_string()));
    }

    #[test]
    fn test_invalid_base() {
        assert!(matches!(
            build_handoff_url("not a url", &items(), 1),
            Err(CheckoutError::InvalidPaymentUrl(_))
        ));
        assert!(matches!(
            build_handoff_url("mailto:pay@example.com", &items(), 1),
            Err(CheckoutError::InvalidPaymentUrl(_))
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_handoff_url("https://pay.example.com/checkout?t=1"),
            Err(CheckoutError::MissingCartParam)
        ));
        assert!(matches!(
            parse_handoff_url("https://pay.example.com/checkout?cart=%7Bbroken"),
            Err(CheckoutError::InvalidCartParam(_))
        ));
    }

    #[test]
    fn test_parse_legacy_url() {
        let url = "https://pay.example.com/?cart=%5B%7B%22id%22%3A%22HAT-1%22%2C%22qty%22%3A%222%22%7D%5D&t=5";
        let items = parse_handoff_url(url).unwrap();
        assert_eq!(items[0].sku, "hat_1");
        assert_eq!(items[0].quantity, 2);
    }
}
