//! CLI command implementations.

pub mod config;
pub mod decode;
pub mod handoff;
pub mod inspect;
pub mod normalize;
pub mod reconcile;

use clap::{Args, Subcommand};

/// Arguments for the normalize command.
#[derive(Args)]
pub struct NormalizeArgs {
    /// JSON file holding an item array, an item object, or a cart envelope.
    pub file: String,
}

/// Arguments for the reconcile command.
#[derive(Args)]
pub struct ReconcileArgs {
    /// JSON file with the local cart.
    pub local: String,

    /// JSON file with the incoming update.
    pub incoming: String,

    /// Treat the update as the sender's complete cart.
    #[arg(short, long)]
    pub snapshot: bool,

    /// Name of the sending context.
    #[arg(long, default_value = "peer")]
    pub source: String,
}

/// Arguments for the handoff command.
#[derive(Args)]
pub struct HandoffArgs {
    /// JSON file with the cart to hand off.
    pub file: String,

    /// Payment page URL (default: from config).
    #[arg(short, long)]
    pub payment_url: Option<String>,
}

/// Arguments for the decode command.
#[derive(Args)]
pub struct DecodeArgs {
    /// Handoff URL to decode.
    pub url: String,
}

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// JSON file mapping storage keys to stored values.
    pub dump: String,

    /// List every key found in the dump.
    #[arg(short, long)]
    pub keys: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Storefront origin to trust.
        #[arg(long, default_value = "https://shop.example.com")]
        shop_origin: String,

        /// Payment page URL.
        #[arg(long, default_value = "https://pay.example.com/checkout")]
        payment_url: String,

        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}
