//! Cart CLI - Inspect and exercise the cart sync protocol offline.
//!
//! Commands:
//! - `cart normalize` - Canonicalize raw item JSON
//! - `cart reconcile` - Merge an incoming update into a local cart
//! - `cart handoff` - Build the payment page URL for a cart
//! - `cart decode` - Decode the cart carried by a handoff URL
//! - `cart inspect` - Show the cart a context would load from a storage dump
//! - `cart config` - Manage configuration

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{ConfigArgs, DecodeArgs, HandoffArgs, InspectArgs, NormalizeArgs, ReconcileArgs};

/// Cart CLI - Inspect and exercise cross-context cart sync
#[derive(Parser)]
#[command(name = "cart")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Canonicalize raw cart item JSON
    Normalize(NormalizeArgs),

    /// Merge an incoming update into a local cart
    Reconcile(ReconcileArgs),

    /// Build the payment page URL for a cart
    Handoff(HandoffArgs),

    /// Decode the cart carried by a handoff URL
    Decode(DecodeArgs),

    /// Show the cart a context would load from a storage dump
    Inspect(InspectArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let output = output::Output::new(cli.verbose, cli.json);

    let config_path = cli.config.as_deref();
    let ctx = match context::Context::load(config_path, output.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Normalize(args) => commands::normalize::run(args, &ctx).await,
        Commands::Reconcile(args) => commands::reconcile::run(args, &ctx).await,
        Commands::Handoff(args) => commands::handoff::run(args, &ctx).await,
        Commands::Decode(args) => commands::decode::run(args, &ctx).await,
        Commands::Inspect(args) => commands::inspect::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` overrides the default level.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
