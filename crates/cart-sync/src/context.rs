//! One browsing context's cart.
//!
//! A [`CartContext`] owns the canonical cart for its context together with
//! the persistence adapter, the messenger and the checkout handoff. Every
//! local mutation is persisted and then pushed to peers; every accepted peer
//! message goes through the reconciler.

use std::fmt;

use cart_bridge::{
    run_handshake, BridgeResult, CartMessage, CartPayload, Delivery, HandshakeSchedule, Inbound,
    MessageTarget, MessageType, Messenger, MessengerState,
};
use cart_checkout::{parse_handoff_url, CheckoutError, CheckoutHandoff, CheckoutOutcome, Navigator, UserNotice};
use cart_core::{normalize, reconcile, Cart, CartError, CartItem, Incoming};
use cart_store::{PersistenceAdapter, StorageBackend};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::SyncConfig;

/// Where a context runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextRole {
    /// The top-level storefront page.
    Host,
    /// The embedded payment page.
    CheckoutFrame,
    /// Any other embedded script (mini-cart, recommendations).
    Widget,
}

impl ContextRole {
    /// Name used as the message `source`.
    pub fn name(&self) -> &'static str {
        match self {
            ContextRole::Host => "host",
            ContextRole::CheckoutFrame => "checkout-frame",
            ContextRole::Widget => "widget",
        }
    }

    /// Whether the context lives inside a parent window.
    pub fn is_embedded(&self) -> bool {
        !matches!(self, ContextRole::Host)
    }
}

impl fmt::Display for ContextRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cart state and collaborators for one context.
pub struct CartContext {
    role: ContextRole,
    cart: Cart,
    store: PersistenceAdapter,
    messenger: Messenger,
    checkout: CheckoutHandoff,
    schedule: HandshakeSchedule,
    ticks: Option<mpsc::UnboundedReceiver<usize>>,
}

impl CartContext {
    /// Assemble a context from its parts.
    pub fn new(role: ContextRole, store: PersistenceAdapter, messenger: Messenger, checkout: CheckoutHandoff) -> Self {
        Self {
            role,
            cart: Cart::pristine(messenger.source()),
            store,
            messenger,
            checkout,
            schedule: HandshakeSchedule::default(),
            ticks: None,
        }
    }

    /// Assemble a context from configuration.
    ///
    /// Recipients are added afterwards with [`add_target`](Self::add_target).
    pub fn from_config(
        role: ContextRole,
        config: &SyncConfig,
        session: impl StorageBackend + 'static,
        local: impl StorageBackend + 'static,
        navigator: impl Navigator + 'static,
        notice: impl UserNotice + 'static,
    ) -> Self {
        let store = PersistenceAdapter::new(config.storage_keys(), session, local);
        let messenger = Messenger::new(role.name(), config.allowlist());
        let checkout = CheckoutHandoff::new(config.handoff(), navigator, notice);
        Self::new(role, store, messenger, checkout).with_schedule(config.handshake_schedule())
    }

    /// Override the handshake schedule.
    pub fn with_schedule(mut self, schedule: HandshakeSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Register a message recipient.
    pub fn add_target(&mut self, target: impl MessageTarget + 'static) {
        self.messenger.add_target(target);
    }

    pub fn role(&self) -> ContextRole {
        self.role
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn state(&self) -> MessengerState {
        self.messenger.state()
    }

    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    /// Restore the cart from storage. Returns whether a cart was found.
    pub fn load_on_start(&mut self) -> bool {
        match self.store.load() {
            Some(cart) => {
                tracing::info!(role = %self.role, items = cart.len(), "restored cart from storage");
                self.cart = cart;
                true
            }
            None => {
                tracing::debug!(role = %self.role, "no stored cart");
                false
            }
        }
    }

    /// Load the stored cart, start listening and begin the handshake.
    ///
    /// Embedded contexts also ask their peers for the current cart. The
    /// handshake runs on a background task until a peer answers, the
    /// schedule runs out, or the context is dropped.
    pub async fn start(&mut self) -> BridgeResult<()> {
        if self.role.is_embedded() && !self.messenger.has_parent() {
            tracing::warn!(role = %self.role, "embedded context has no parent recipient");
        }

        self.load_on_start();
        let peer_ready = self.messenger.start()?;

        if self.role.is_embedded() {
            self.messenger.request_cart();
        }

        let (tx, ticks) = mpsc::unbounded_channel();
        let schedule = self.schedule.clone();
        let role = self.role;
        tokio::spawn(async move {
            let outcome = run_handshake(&schedule, peer_ready, |attempt| {
                let _ = tx.send(attempt);
            })
            .await;
            tracing::debug!(%role, ?outcome, "handshake finished");
        });
        self.ticks = Some(ticks);
        Ok(())
    }

    /// Process handshake signals and inbound messages until the inbox
    /// closes.
    pub async fn run(&mut self, inbox: &mut mpsc::UnboundedReceiver<Delivery>) {
        loop {
            tokio::select! {
                tick = next_tick(&mut self.ticks) => match tick {
                    Some(attempt) => {
                        tracing::debug!(role = %self.role, attempt, "signalling ready");
                        self.messenger.signal_ready(&self.cart);
                    }
                    None => self.ticks = None,
                },
                delivery = inbox.recv() => match delivery {
                    Some(delivery) => {
                        self.handle_message(&delivery.origin, &delivery.data);
                    }
                    None => break,
                },
            }
        }
    }

    /// Handle every message already waiting in `inbox`. Returns how many
    /// were handled.
    pub fn drain(&mut self, inbox: &mut mpsc::UnboundedReceiver<Delivery>) -> usize {
        let mut handled = 0;
        while let Ok(delivery) = inbox.try_recv() {
            self.handle_message(&delivery.origin, &delivery.data);
            handled += 1;
        }
        handled
    }

    /// Validate and apply one inbound message.
    pub fn handle_message(&mut self, origin: &str, raw: &Value) -> Inbound {
        let inbound = self.messenger.receive(origin, raw);
        if let Inbound::Accepted(message) = &inbound {
            self.apply(message.clone());
        }
        inbound
    }

    fn apply(&mut self, message: CartMessage) {
        match message {
            CartMessage::RequestCart { .. } => {
                self.messenger.push_cart(&self.cart);
            }
            CartMessage::PushCartData { payload, source } | CartMessage::CheckoutInitiated { payload, source } => {
                self.merge(payload, &source);
            }
            CartMessage::CartReady { payload, source } => {
                if let Some(payload) = payload {
                    self.merge(payload, &source);
                }
                self.messenger.notify(MessageType::CartAck);
            }
            CartMessage::CartAck { .. } => {}
            CartMessage::OrderCompleted { source, at } | CartMessage::ClearCart { source, at } => {
                if at.is_some_and(|at| at < self.cart.timestamp) {
                    tracing::debug!(role = %self.role, %source, "ignoring stale clear");
                    return;
                }
                tracing::info!(role = %self.role, %source, "peer cleared the cart");
                self.cart.clear();
                if let Some(at) = at {
                    self.cart.timestamp = at;
                }
                self.store.clear();
            }
        }
    }

    fn merge(&mut self, payload: CartPayload, source: &str) {
        let sent_items = payload.items.clone();
        let outcome = reconcile(&self.cart, &payload.into_incoming(source));

        if !outcome.applied || !outcome.changed {
            tracing::debug!(role = %self.role, source, applied = outcome.applied, "cart unchanged");
            return;
        }

        self.cart = outcome.cart;
        self.store.save(&self.cart);

        // The sender already has these exact items; only push when the
        // merge kept something it doesn't know about.
        if self.cart.items != sent_items {
            self.messenger.push_cart(&self.cart);
        }
    }

    /// Persist and push the cart after a local mutation.
    fn commit(&mut self) {
        self.store.save(&self.cart);
        self.messenger.push_cart(&self.cart);
    }

    /// Add a product from an arbitrary item shape.
    ///
    /// Returns the resulting quantity, or `None` when the value is not an
    /// item.
    pub fn add_item(&mut self, raw: &Value) -> Option<u32> {
        let Some(item) = normalize(std::slice::from_ref(raw)).into_iter().next() else {
            tracing::warn!(role = %self.role, "ignoring add of a non-item value");
            return None;
        };
        Some(self.add_product(item))
    }

    /// Add a canonical item.
    pub fn add_product(&mut self, item: CartItem) -> u32 {
        let quantity = self.cart.add_item(item);
        self.commit();
        quantity
    }

    /// Remove an item. Returns whether it was in the cart.
    pub fn remove_item(&mut self, sku: &str) -> bool {
        let removed = self.cart.remove_item(sku);
        if removed {
            self.commit();
        }
        removed
    }

    /// Set an item's quantity. Zero removes it.
    pub fn set_quantity(&mut self, sku: &str, quantity: u32) -> Result<(), CartError> {
        self.cart.set_quantity(sku, quantity)?;
        self.commit();
        Ok(())
    }

    /// Empty the cart here, in storage, and in every peer.
    pub fn clear(&mut self) {
        self.cart.clear();
        self.store.clear();
        self.messenger.announce_cleared(&self.cart, false);
    }

    /// Payment succeeded: clear everywhere and tell peers the order is done.
    pub fn complete_order(&mut self) {
        tracing::info!(role = %self.role, total = self.cart.total_amount(), "order completed");
        self.cart.clear();
        self.store.clear();
        self.messenger.announce_cleared(&self.cart, true);
    }

    /// Hand the cart to the payment page.
    pub async fn checkout(&mut self) -> CheckoutOutcome {
        self.checkout.initiate(&self.cart, &mut self.store, &self.messenger).await
    }

    /// Seed the cart from a handoff URL, as the payment page does on load.
    ///
    /// The URL carries the complete cart, so it replaces local items.
    pub fn seed_from_handoff(&mut self, url: &str) -> Result<usize, CheckoutError> {
        let items = parse_handoff_url(url)?;
        let outcome = reconcile(&self.cart, &Incoming::snapshot(items, "handoff-url"));
        if outcome.changed {
            self.cart = outcome.cart;
            self.store.save(&self.cart);
        }
        Ok(self.cart.len())
    }
}

async fn next_tick(ticks: &mut Option<mpsc::UnboundedReceiver<usize>>) -> Option<usize> {
    match ticks {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
