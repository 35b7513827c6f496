//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};
use cart_sync::{generate_default_config, CONFIG_FILE_NAMES};

use super::{ConfigArgs, ConfigCommand};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Init {
            shop_origin,
            payment_url,
            force,
        } => init_config(&shop_origin, &payment_url, force, ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }

    let config = &ctx.config;

    ctx.output.info("");
    ctx.output.info("[storage]");
    ctx.output.kv("primary_key", &config.storage.primary_key);
    ctx.output.kv("legacy_keys", &config.storage.legacy_keys.join(", "));

    ctx.output.info("");
    ctx.output.info("[origins]");
    if config.origins.allowed.is_empty() {
        ctx.output.kv("allowed", "(none)");
    }
    for origin in &config.origins.allowed {
        ctx.output.list_item(origin);
    }
    if !config.origins.patterns.is_empty() {
        ctx.output.kv("patterns", &config.origins.patterns.join(", "));
    }
    if !config.origins.denied_hosts.is_empty() {
        ctx.output.kv("denied_hosts", &config.origins.denied_hosts.join(", "));
    }
    ctx.output.kv("allow_http", &config.origins.allow_http.to_string());

    ctx.output.info("");
    ctx.output.info("[handshake]");
    let delays: Vec<String> = config.handshake.delays_ms.iter().map(|d| format!("{d}ms")).collect();
    ctx.output.kv("delays", &delays.join(", "));

    ctx.output.info("");
    ctx.output.info("[checkout]");
    ctx.output.kv("payment_url", &config.checkout.payment_url);
    ctx.output
        .kv("navigation_delay_ms", &config.checkout.navigation_delay_ms.to_string());
    ctx.output.kv("notify_timeout_ms", &config.checkout.notify_timeout_ms.to_string());

    if ctx.output.is_verbose() {
        ctx.output.info("");
        ctx.output.info("As TOML:");
        println!("{}", toml::to_string_pretty(config)?);
    }

    Ok(())
}

async fn init_config(shop_origin: &str, payment_url: &str, force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join(CONFIG_FILE_NAMES[0]);

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let content = generate_default_config(shop_origin, payment_url);
    let parsed: cart_sync::SyncConfig = toml::from_str(&content)?;
    parsed.validate()?;

    fs::write(&config_path, content)?;

    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    ctx.config.validate()?;

    let mut warnings: Vec<String> = Vec::new();

    if ctx.config.origins.allowed.is_empty() && ctx.config.origins.patterns.is_empty() {
        warnings.push("origins: no peer origin is trusted besides the payment page".to_string());
    }
    if ctx.config.origins.allow_http {
        warnings.push("origins.allow_http is enabled; use it for local development only".to_string());
    }
    if ctx.config.handshake.delays_ms.is_empty() {
        warnings.push("handshake.delays_ms is empty; contexts will only sync on request".to_string());
    }
    if ctx.config.checkout.navigation_delay_ms == 0 {
        warnings.push("checkout.navigation_delay_ms is 0; the checkout broadcast may be lost".to_string());
    }

    if warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    ctx.output.success("Configuration is valid (with warnings)");

    Ok(())
}
