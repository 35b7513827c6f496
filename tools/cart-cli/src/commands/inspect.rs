//! Show the cart a context would load from a storage dump.

use anyhow::{bail, Result};
use cart_store::{MemoryBackend, PersistenceAdapter};
use serde_json::Value;

use super::InspectArgs;
use crate::context::Context;

/// Run the inspect command.
pub async fn run(args: InspectArgs, ctx: &Context) -> Result<()> {
    let dump = ctx.read_json(&args.dump)?;
    let entries = dump_entries(&dump)?;

    if args.keys && !ctx.output.is_json() {
        ctx.output.header("Stored keys");
        for (key, raw) in &entries {
            let marker = if ctx.config.storage_keys().iter().any(|k| k == key.as_str()) {
                "cart key"
            } else {
                "other"
            };
            ctx.output.list_item(&format!("{key} ({marker}, {} bytes)", raw.len()));
        }
    }

    let store = PersistenceAdapter::new(
        ctx.config.storage_keys(),
        MemoryBackend::new(),
        MemoryBackend::with_entries(entries),
    );

    match store.load() {
        Some(cart) => {
            ctx.output.header("Loaded cart");
            ctx.output.cart(&cart);
        }
        None => {
            if ctx.output.is_json() {
                ctx.output.json(&Value::Null);
            } else {
                ctx.output.warn("No cart found under any configured key");
            }
        }
    }
    Ok(())
}

/// Storage holds strings; dumps may also inline the parsed JSON.
fn dump_entries(dump: &Value) -> Result<Vec<(String, String)>> {
    let Some(obj) = dump.as_object() else {
        bail!("storage dump must be a JSON object of key to stored value");
    };

    Ok(obj
        .iter()
        .map(|(key, value)| {
            let raw = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), raw)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dump_entries_accepts_strings_and_inline_json() {
        let dump = json!({
            "cart": "[{\"sku\":\"a\"}]",
            "turbo_cart": { "items": [] },
        });
        let mut entries = dump_entries(&dump).unwrap();
        entries.sort();

        assert_eq!(entries[0], ("cart".to_string(), "[{\"sku\":\"a\"}]".to_string()));
        assert_eq!(entries[1], ("turbo_cart".to_string(), "{\"items\":[]}".to_string()));
    }

    #[test]
    fn test_dump_must_be_object() {
        assert!(dump_entries(&json!([1, 2])).is_err());
    }
}
