//! Build the payment page URL for a cart.

use anyhow::{Context as _, Result};
use cart_checkout::build_handoff_url;
use cart_core::Cart;
use chrono::Utc;

use super::HandoffArgs;
use crate::context::Context;

/// Run the handoff command.
pub async fn run(args: HandoffArgs, ctx: &Context) -> Result<()> {
    let value = ctx.read_json(&args.file)?;
    let cart = Cart::from_value(&value, "cli").with_context(|| format!("{} holds no recognizable cart", args.file))?;

    if cart.is_empty() {
        anyhow::bail!("Cart is empty; there is nothing to hand off");
    }

    let base = args
        .payment_url
        .unwrap_or_else(|| ctx.config.checkout.payment_url.clone());
    let url = build_handoff_url(&base, &cart.items, Utc::now().timestamp_millis())?;

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "url": url,
            "totalAmount": cart.total_amount(),
            "totalItems": cart.total_items(),
        }));
        return Ok(());
    }

    println!("{}", url);
    ctx.output.debug(&format!(
        "{} item(s), total {}",
        cart.total_items(),
        crate::output::format_money(cart.total_amount())
    ));
    Ok(())
}
