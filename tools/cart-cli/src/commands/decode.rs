//! Decode a handoff URL.

use anyhow::Result;
use cart_checkout::parse_handoff_url;
use cart_core::Cart;

use super::DecodeArgs;
use crate::context::Context;

/// Run the decode command.
pub async fn run(args: DecodeArgs, ctx: &Context) -> Result<()> {
    let items = parse_handoff_url(&args.url)?;
    let cart = Cart::from_items(items, "handoff-url");

    ctx.output.header("Handoff cart");
    ctx.output.cart(&cart);
    Ok(())
}
