//! Cart reconciliation.
//!
//! Messages between contexts arrive in no guaranteed order, and the same
//! handshake can fire several times. Determinism comes only from the rules
//! here:
//!
//! 1. An incoming update older than the local cart is ignored.
//! 2. For a sku present on both sides, the incoming entry replaces the local
//!    one (quantity is replaced, never added).
//! 3. Skus only present in the update are appended in update order.
//! 4. Skus only present locally survive, unless the update is a full
//!    snapshot.

use chrono::{DateTime, Utc};

use crate::cart::{Cart, CartItem};

/// An external cart update.
#[derive(Debug, Clone, PartialEq)]
pub struct Incoming {
    /// Normalized items carried by the update.
    pub items: Vec<CartItem>,
    /// Mutation time of the sender's cart. `None` is treated as "now".
    pub timestamp: Option<DateTime<Utc>>,
    /// Whether the update is the sender's complete cart.
    pub snapshot: bool,
    /// Sending context.
    pub source: String,
}

impl Incoming {
    /// A partial update.
    pub fn partial(items: Vec<CartItem>, source: impl Into<String>) -> Self {
        Self {
            items,
            timestamp: None,
            snapshot: false,
            source: source.into(),
        }
    }

    /// A full-replacement snapshot.
    pub fn snapshot(items: Vec<CartItem>, source: impl Into<String>) -> Self {
        Self {
            snapshot: true,
            ..Self::partial(items, source)
        }
    }

    /// The sender's complete cart, keeping its timestamp.
    pub fn from_cart(cart: &Cart) -> Self {
        Self {
            items: cart.items.clone(),
            timestamp: Some(cart.timestamp),
            snapshot: true,
            source: cart.source.clone(),
        }
    }

    /// Set the sender's cart timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Result of a reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    /// The reconciled cart.
    pub cart: Cart,
    /// `false` when the update was stale and the local cart was kept as is.
    pub applied: bool,
    /// Whether the item list differs from the local one.
    pub changed: bool,
}

/// Merge an incoming update into the local cart.
pub fn reconcile(local: &Cart, incoming: &Incoming) -> ReconcileOutcome {
    if let Some(ts) = incoming.timestamp {
        if ts < local.timestamp {
            tracing::debug!(
                source = %incoming.source,
                incoming = %ts,
                local = %local.timestamp,
                "ignoring stale cart update"
            );
            return ReconcileOutcome {
                cart: local.clone(),
                applied: false,
                changed: false,
            };
        }
    }

    let mut merged: Vec<CartItem> = if incoming.snapshot {
        Vec::with_capacity(incoming.items.len())
    } else {
        local.items.clone()
    };

    for item in &incoming.items {
        match merged.iter_mut().find(|i| i.sku == item.sku) {
            Some(existing) => *existing = item.clone(),
            None => merged.push(item.clone()),
        }
    }

    // The merged cart is as new as the update it took in, so every context
    // that applied the same update orders later messages the same way.
    let changed = merged != local.items;
    let cart = Cart {
        items: merged,
        timestamp: incoming.timestamp.unwrap_or_else(Utc::now),
        source: incoming.source.clone(),
    };

    ReconcileOutcome {
        cart,
        applied: true,
        changed,
    }
}
