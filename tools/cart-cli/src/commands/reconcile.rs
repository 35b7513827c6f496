//! Merge an incoming update into a local cart.

use anyhow::{Context as _, Result};
use cart_core::{extract_timestamp, normalize_value, reconcile, Cart, Incoming};
use serde_json::Value;

use super::ReconcileArgs;
use crate::context::Context;

/// Run the reconcile command.
pub async fn run(args: ReconcileArgs, ctx: &Context) -> Result<()> {
    let local_value = ctx.read_json(&args.local)?;
    let local = Cart::from_value(&local_value, "local")
        .with_context(|| format!("{} holds no recognizable cart", args.local))?;

    let incoming_value = ctx.read_json(&args.incoming)?;
    let items = normalize_value(&incoming_value)
        .with_context(|| format!("{} holds no recognizable item list", args.incoming))?;
    let snapshot = args.snapshot || incoming_value.get("snapshot").and_then(Value::as_bool) == Some(true);

    let incoming = Incoming {
        items,
        timestamp: extract_timestamp(&incoming_value),
        snapshot,
        source: args.source,
    };

    let outcome = reconcile(&local, &incoming);

    if !outcome.applied {
        ctx.output.warn("Incoming update is older than the local cart; local cart kept");
    } else if !outcome.changed {
        ctx.output.info("Incoming update matches the local cart");
    }

    ctx.output.header(if snapshot { "Reconciled cart (snapshot)" } else { "Reconciled cart" });
    ctx.output.cart(&outcome.cart);
    Ok(())
}
