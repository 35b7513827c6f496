//! Cart synchronization across browsing contexts.
//!
//! This crate provides:
//! - `CartContext` - One context's cart, storage, messenger and checkout, wired together
//! - `ContextRole` - Host page, embedded payment page, or widget
//! - `SyncConfig` - Storage keys, trusted origins, handshake and checkout settings
//!
//! # Example
//!
//! ```rust,ignore
//! use cart_sync::prelude::*;
//!
//! let config = SyncConfig::load("cart-sync.toml")?;
//! let mut ctx = CartContext::from_config(
//!     ContextRole::Host,
//!     &config,
//!     session_storage,
//!     local_storage,
//!     navigator,
//!     notice,
//! );
//! ctx.add_target(payment_frame);
//! ctx.start().await?;
//! ctx.run(&mut inbox).await;
//! ```

mod config;
mod context;

pub use config::*;
pub use context::*;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{generate_default_config, ConfigError, SyncConfig};
    pub use crate::context::{CartContext, ContextRole};
    pub use cart_bridge::{ChannelTarget, Delivery, Inbound, TargetKind};
    pub use cart_checkout::CheckoutOutcome;
    pub use cart_core::prelude::*;
}
