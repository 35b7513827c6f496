//! Canonical cart model for cross-context cart synchronization.
//!
//! This crate provides the pieces every browsing context agrees on:
//!
//! - **Normalizer**: turns heterogeneous, legacy item shapes into [`CartItem`]s
//! - **Cart**: ordered, sku-unique item list with derived aggregates
//! - **Envelope**: the `PersistedEnvelope` shape written to storage and the wire
//! - **Reconciler**: deterministic merge of a local cart with an incoming update
//!
//! # Example
//!
//! ```rust,ignore
//! use cart_core::prelude::*;
//! use serde_json::json;
//!
//! let items = normalize(&[json!({ "id": "TEE-Black", "price": "19.99", "qty": "2" })]);
//! let mut cart = Cart::new("host");
//! for item in items {
//!     cart.add_item(item);
//! }
//!
//! let incoming = Incoming::snapshot(other_items, "checkout-frame");
//! let outcome = reconcile(&cart, &incoming);
//! println!("Total: {}", outcome.cart.total_amount());
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod cart;
pub mod envelope;
pub mod normalize;
pub mod reconcile;

pub use cart::{Cart, CartItem, DEFAULT_CATEGORY, DEFAULT_NAME, MAX_QUANTITY_PER_ITEM};
pub use envelope::PersistedEnvelope;
pub use error::CartError;
pub use normalize::{extract_timestamp, normalize, normalize_sku, normalize_value};
pub use reconcile::{reconcile, Incoming, ReconcileOutcome};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::cart::{Cart, CartItem, MAX_QUANTITY_PER_ITEM};
    pub use crate::envelope::PersistedEnvelope;
    pub use crate::error::CartError;
    pub use crate::normalize::{normalize, normalize_value};
    pub use crate::reconcile::{reconcile, Incoming, ReconcileOutcome};
}
