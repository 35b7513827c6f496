//! Item normalization.
//!
//! Scripts of several generations wrote cart items in different shapes:
//! `id` instead of `sku`, `qty` instead of `quantity`, prices as strings,
//! `title` for the name. Everything entering the cart goes through
//! [`normalize`] first, so the rest of the system only ever sees
//! [`CartItem`].

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::cart::{CartItem, DEFAULT_CATEGORY, DEFAULT_NAME, MAX_QUANTITY_PER_ITEM};
use crate::ids::generate_token;
use crate::money::parse_price;

const SKU_FIELDS: &[&str] = &["sku", "id"];
const NAME_FIELDS: &[&str] = &["name", "title", "productName"];
const IMAGE_FIELDS: &[&str] = &["image", "img", "imageUrl"];
const QUANTITY_FIELDS: &[&str] = &["quantity", "qty"];

/// Normalize a list of raw items.
///
/// Elements that are not objects are dropped. Items sharing a sku are folded
/// into one entry with summed quantity, so the output never violates the
/// sku-uniqueness invariant. The function is idempotent.
pub fn normalize(raw: &[Value]) -> Vec<CartItem> {
    let mut out: Vec<CartItem> = Vec::with_capacity(raw.len());

    for (index, value) in raw.iter().enumerate() {
        let Some(obj) = value.as_object() else {
            tracing::debug!(index, "dropping non-object cart entry");
            continue;
        };

        let item = normalize_item(obj);
        match out.iter_mut().find(|i| i.sku == item.sku) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .saturating_add(item.quantity)
                    .min(MAX_QUANTITY_PER_ITEM);
            }
            None => out.push(item),
        }
    }

    out
}

/// Normalize items out of any known top-level payload shape.
///
/// Accepts a bare item array, a persisted envelope (`items`), or a message
/// envelope carrying the list in `data`, `cart` or `cartItems`. Returns
/// `None` when no item list can be found.
pub fn normalize_value(value: &Value) -> Option<Vec<CartItem>> {
    match value {
        Value::Array(items) => Some(normalize(items)),
        Value::Object(obj) => ["items", "data", "cart", "cartItems"]
            .iter()
            .filter_map(|field| obj.get(*field))
            .find_map(normalize_value),
        _ => None,
    }
}

/// Find the cart timestamp in a payload.
///
/// A nested `data.timestamp` (the cart's own mutation time) wins over the
/// outer message timestamp. RFC 3339 strings and epoch milliseconds are
/// understood.
pub fn extract_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let obj = value.as_object()?;
    obj.get("data")
        .and_then(extract_timestamp)
        .or_else(|| obj.get("timestamp").and_then(parse_timestamp))
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

/// Normalize a sku: lowercase, dashes to underscores, every other
/// non-alphanumeric character removed.
///
/// Lowercasing comes first because it can expand a character into an
/// alphanumeric plus a combining mark (`İ` becomes `i` and U+0307).
pub fn normalize_sku(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .filter_map(|c| match c {
            '-' | '_' => Some('_'),
            c if c.is_alphanumeric() => Some(c),
            _ => None,
        })
        .collect()
}

fn normalize_item(obj: &Map<String, Value>) -> CartItem {
    let sku = SKU_FIELDS
        .iter()
        .filter_map(|field| obj.get(*field))
        .filter_map(scalar_to_string)
        .map(|s| normalize_sku(&s))
        .find(|s| !s.is_empty())
        .unwrap_or_else(generate_token);

    let name = first_string(obj, NAME_FIELDS).unwrap_or_else(|| DEFAULT_NAME.to_string());
    let image = first_string(obj, IMAGE_FIELDS);
    let category =
        first_string(obj, &["category"]).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    let quantity = QUANTITY_FIELDS
        .iter()
        .find_map(|field| obj.get(*field))
        .map(parse_quantity)
        .unwrap_or(1);

    CartItem {
        id: sku.clone(),
        sku,
        name,
        price: parse_price(obj.get("price")),
        quantity,
        image,
        category,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_string(obj: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|field| obj.get(*field))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Integer parse clamped to `1..=MAX_QUANTITY_PER_ITEM`.
fn parse_quantity(value: &Value) -> u32 {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    };

    match parsed {
        Some(q) if q >= 1 => q.min(i64::from(MAX_QUANTITY_PER_ITEM)) as u32,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::is_generated;
    use serde_json::json;

    #[test]
    fn test_sku_normalization() {
        assert_eq!(normalize_sku("TEE-Black"), "tee_black");
        assert_eq!(normalize_sku(" Mug 01 "), "mug01");
        assert_eq!(normalize_sku("a.b/c"), "abc");
        assert_eq!(normalize_sku("already_ok"), "already_ok");
        assert_eq!(normalize_sku("İPhone-12"), "iphone_12");
        assert_eq!(normalize_sku(&normalize_sku("İPhone-12")), "iphone_12");
        assert_eq!(normalize_sku("Straße"), "straße");
    }

    #[test]
    fn test_sku_resolution_order() {
        let items = normalize(&[
            json!({ "sku": "SKU-1", "id": "ignored" }),
            json!({ "id": 42 }),
            json!({ "sku": "  ", "id": "Fallback" }),
            json!({ "name": "nothing" }),
        ]);

        assert_eq!(items[0].sku, "sku_1");
        assert_eq!(items[1].sku, "42");
        assert_eq!(items[2].sku, "fallback");
        assert!(is_generated(&items[3].sku));
        assert!(items.iter().all(|i| i.id == i.sku));
    }

    #[test]
    fn test_legacy_field_names() {
        let items = normalize(&[json!({
            "id": "hat",
            "title": "Sun Hat",
            "qty": "3",
            "price": "24.50",
            "img": "/hat.png"
        })]);

        let hat = &items[0];
        assert_eq!(hat.name, "Sun Hat");
        assert_eq!(hat.quantity, 3);
        assert_eq!(hat.price, 24.5);
        assert_eq!(hat.image.as_deref(), Some("/hat.png"));
        assert_eq!(hat.category, "general");
    }

    #[test]
    fn test_quantity_coercion() {
        let items = normalize(&[
            json!({ "sku": "a", "quantity": 0 }),
            json!({ "sku": "b", "quantity": -4 }),
            json!({ "sku": "c", "quantity": "2.7" }),
            json!({ "sku": "d", "quantity": "lots" }),
            json!({ "sku": "e", "quantity": 1_000_000 }),
            json!({ "sku": "f" }),
        ]);
        let quantities: Vec<u32> = items.iter().map(|i| i.quantity).collect();
        assert_eq!(quantities, vec![1, 1, 2, 1, MAX_QUANTITY_PER_ITEM, 1]);
    }

    #[test]
    fn test_non_objects_dropped() {
        let items = normalize(&[json!(null), json!("a"), json!(3), json!({ "sku": "ok" })]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].sku, "ok");
        assert_eq!(items[0].name, "Product");
    }

    #[test]
    fn test_duplicate_skus_folded() {
        let items = normalize(&[
            json!({ "sku": "A-1", "quantity": 2 }),
            json!({ "sku": "a_1", "quantity": 3 }),
        ]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = vec![
            json!({ "id": "Tee-Black", "price": "$19.99", "qty": 2, "title": "Tee" }),
            json!({ "sku": "mug", "price": -1, "image": "m.png", "category": "kitchen" }),
            json!({ "name": "no id at all" }),
            json!(7),
        ];

        let once = normalize(&raw);
        let as_values: Vec<Value> = once
            .iter()
            .map(|i| serde_json::to_value(i).unwrap())
            .collect();
        let twice = normalize(&as_values);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_value_shapes() {
        let item = json!({ "sku": "a", "price": 1 });

        assert_eq!(normalize_value(&json!([item])).unwrap().len(), 1);
        assert_eq!(normalize_value(&json!({ "items": [item] })).unwrap().len(), 1);
        assert_eq!(
            normalize_value(&json!({ "type": "push-cart-data", "data": { "items": [item] } }))
                .unwrap()
                .len(),
            1
        );
        assert_eq!(normalize_value(&json!({ "cart": [item] })).unwrap().len(), 1);
        assert_eq!(normalize_value(&json!({ "cartItems": [item] })).unwrap().len(), 1);
        assert_eq!(normalize_value(&json!({ "data": [item] })).unwrap().len(), 1);
        assert!(normalize_value(&json!({ "type": "request-cart" })).is_none());
        assert!(normalize_value(&json!(null)).is_none());
    }

    #[test]
    fn test_extract_timestamp_prefers_inner() {
        let value = json!({
            "timestamp": "2024-01-02T00:00:00Z",
            "data": { "items": [], "timestamp": "2024-01-01T00:00:00Z" }
        });
        let ts = extract_timestamp(&value).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_extract_timestamp_epoch_millis() {
        let ts = extract_timestamp(&json!({ "timestamp": 1_700_000_000_000i64 })).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert!(extract_timestamp(&json!({ "timestamp": "yesterday" })).is_none());
    }
}
