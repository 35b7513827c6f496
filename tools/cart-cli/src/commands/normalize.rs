//! Normalize raw item JSON.

use anyhow::{bail, Result};
use cart_core::normalize_value;

use super::NormalizeArgs;
use crate::context::Context;

/// Run the normalize command.
pub async fn run(args: NormalizeArgs, ctx: &Context) -> Result<()> {
    let value = ctx.read_json(&args.file)?;

    let items = match normalize_value(&value) {
        Some(items) => items,
        None if value.is_object() => cart_core::normalize(std::slice::from_ref(&value)),
        None => bail!("{} holds no recognizable item list", args.file),
    };

    ctx.output.header("Normalized items");
    ctx.output.items(&items);
    ctx.output.debug(&format!("{} item(s)", items.len()));
    Ok(())
}
