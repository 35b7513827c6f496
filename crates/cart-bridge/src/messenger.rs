//! Per-context messenger.

use std::fmt;

use cart_core::Cart;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::{BridgeError, BridgeResult};
use crate::message::{CartMessage, MessageType};
use crate::origin::OriginAllowlist;
use crate::target::{MessageTarget, TargetKind};

/// Messenger lifecycle.
///
/// `Uninitialized → Listening → AwaitingPeerAck ⇄ Ready`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessengerState {
    /// No inbound handler attached yet.
    Uninitialized,
    /// Handler attached, no handshake signal sent.
    Listening,
    /// A peer has answered.
    Ready,
    /// A ready signal or cart request is out, waiting for a peer.
    AwaitingPeerAck,
}

impl fmt::Display for MessengerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessengerState::Uninitialized => "uninitialized",
            MessengerState::Listening => "listening",
            MessengerState::Ready => "ready",
            MessengerState::AwaitingPeerAck => "awaiting-peer-ack",
        };
        f.write_str(s)
    }
}

/// Result of handling one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A validated message from an allowed peer.
    Accepted(CartMessage),
    /// Not for us: unknown type, own echo, or not listening yet.
    Ignored(String),
    /// Untrusted origin or malformed message.
    Rejected(String),
}

/// Outcome of a fan-out broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Sends and receives cart messages for one browsing context.
pub struct Messenger {
    source: String,
    allowlist: OriginAllowlist,
    targets: Vec<Box<dyn MessageTarget>>,
    state: MessengerState,
    peer_ready: watch::Sender<bool>,
}

impl Messenger {
    /// Create a messenger for the context named `source`.
    pub fn new(source: impl Into<String>, allowlist: OriginAllowlist) -> Self {
        let (peer_ready, _) = watch::channel(false);
        Self {
            source: source.into(),
            allowlist,
            targets: Vec::new(),
            state: MessengerState::Uninitialized,
            peer_ready,
        }
    }

    /// Register a recipient.
    pub fn add_target(&mut self, target: impl MessageTarget + 'static) {
        self.targets.push(Box::new(target));
    }

    /// Builder form of [`add_target`](Self::add_target).
    pub fn with_target(mut self, target: impl MessageTarget + 'static) -> Self {
        self.add_target(target);
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn state(&self) -> MessengerState {
        self.state
    }

    pub fn allowlist(&self) -> &OriginAllowlist {
        &self.allowlist
    }

    /// Whether a parent window is among the recipients.
    pub fn has_parent(&self) -> bool {
        self.targets.iter().any(|t| t.kind() == TargetKind::Parent)
    }

    /// Attach the inbound handler.
    ///
    /// Returns a receiver that flips to `true` once a peer answers; feed it
    /// to [`run_handshake`](crate::run_handshake).
    pub fn start(&mut self) -> BridgeResult<watch::Receiver<bool>> {
        if self.state != MessengerState::Uninitialized {
            return Err(BridgeError::AlreadyStarted);
        }
        self.state = MessengerState::Listening;
        tracing::debug!(source = %self.source, "messenger listening");
        Ok(self.peer_ready.subscribe())
    }

    /// Subscribe to the peer-ready flag.
    pub fn peer_ready(&self) -> watch::Receiver<bool> {
        self.peer_ready.subscribe()
    }

    /// Broadcast a ready signal carrying the local cart.
    pub fn signal_ready(&mut self, cart: &Cart) -> BroadcastReport {
        if self.state == MessengerState::Listening {
            self.state = MessengerState::AwaitingPeerAck;
        }
        self.broadcast(&CartMessage::ready(cart).sent_by(&self.source))
    }

    /// Push the complete local cart to peers.
    pub fn push_cart(&self, cart: &Cart) -> BroadcastReport {
        self.broadcast(&CartMessage::push_snapshot(cart).sent_by(&self.source))
    }

    /// Send a payload-free message of the given kind.
    pub fn notify(&self, kind: MessageType) -> BroadcastReport {
        let source = self.source.clone();
        let message = match kind {
            MessageType::RequestCart => CartMessage::RequestCart { source },
            MessageType::CartAck => CartMessage::CartAck { source },
            MessageType::OrderCompleted => CartMessage::OrderCompleted { source, at: None },
            MessageType::ClearCart => CartMessage::ClearCart { source, at: None },
            MessageType::PushCartData | MessageType::CartReady | MessageType::CheckoutInitiated => {
                tracing::warn!(msg_type = %kind, "message kind needs a cart, not sent");
                return BroadcastReport::default();
            }
        };
        self.broadcast(&message)
    }

    /// Tell peers the cart was emptied, stamped with the cleared cart's
    /// timestamp so late deliveries can be recognized as stale.
    pub fn announce_cleared(&self, cart: &Cart, order_completed: bool) -> BroadcastReport {
        let source = self.source.clone();
        let at = Some(cart.timestamp);
        let message = if order_completed {
            CartMessage::OrderCompleted { source, at }
        } else {
            CartMessage::ClearCart { source, at }
        };
        self.broadcast(&message)
    }

    /// Ask peers to push their cart.
    pub fn request_cart(&mut self) -> BroadcastReport {
        if self.state != MessengerState::Uninitialized {
            self.state = MessengerState::AwaitingPeerAck;
        }
        self.notify(MessageType::RequestCart)
    }

    /// Fan a message out to every recipient.
    ///
    /// Recipients other than the own window are skipped unless their origin
    /// is allow-listed. Delivery failures are logged and counted, never
    /// returned: a missing peer is not an error.
    pub fn broadcast(&self, message: &CartMessage) -> BroadcastReport {
        let wire = message.to_value();
        let mut report = BroadcastReport::default();

        for target in &self.targets {
            if target.kind() != TargetKind::SelfWindow && !self.allowlist.is_allowed(target.origin()) {
                tracing::debug!(
                    target = %target.kind(),
                    origin = target.origin(),
                    "skipping recipient outside allowlist"
                );
                report.skipped += 1;
                continue;
            }

            match target.post(&wire) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(target = %target.kind(), error = %e, "broadcast failed");
                    report.failed += 1;
                }
            }
        }

        tracing::debug!(
            msg_type = %message.message_type(),
            delivered = report.delivered,
            skipped = report.skipped,
            failed = report.failed,
            "broadcast"
        );
        report
    }

    /// Validate an inbound message.
    pub fn receive(&mut self, origin: &str, raw: &Value) -> Inbound {
        if self.state == MessengerState::Uninitialized {
            return Inbound::Ignored("messenger not listening".to_string());
        }

        if let Err(e) = self.allowlist.check_origin(origin) {
            tracing::warn!(origin, error = %e, "rejecting message from untrusted origin");
            return Inbound::Rejected(e.to_string());
        }

        let message = match CartMessage::parse(raw) {
            Ok(message) => message,
            Err(BridgeError::UnknownType(tag)) => {
                tracing::trace!(msg_type = %tag, "ignoring unrelated message");
                return Inbound::Ignored(format!("unknown type {}", tag));
            }
            Err(e) => {
                tracing::warn!(origin, error = %e, "rejecting malformed message");
                return Inbound::Rejected(e.to_string());
            }
        };

        if message.source() == self.source {
            return Inbound::Ignored("own message".to_string());
        }

        if matches!(
            message.message_type(),
            MessageType::CartReady | MessageType::CartAck | MessageType::PushCartData
        ) {
            self.mark_peer_ready();
        }

        tracing::debug!(origin, msg_type = %message.message_type(), source = message.source(), "message accepted");
        Inbound::Accepted(message)
    }

    /// Record that a peer answered, cancelling outstanding handshake retries.
    pub fn mark_peer_ready(&mut self) {
        self.state = MessengerState::Ready;
        self.peer_ready.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::RecordingTarget;
    use cart_core::CartItem;
    use serde_json::json;

    const SHOP: &str = "https://shop.example.com";
    const PAY: &str = "https://pay.example.com";

    fn allowlist() -> OriginAllowlist {
        OriginAllowlist::new().allow_origins(&[SHOP, PAY])
    }

    fn cart() -> Cart {
        let mut cart = Cart::new("host");
        cart.add_item(CartItem::new("a", "A", 1.0, 1));
        cart
    }

    #[test]
    fn test_state_transitions() {
        let mut messenger = Messenger::new("host", allowlist());
        assert_eq!(messenger.state(), MessengerState::Uninitialized);

        let rx = messenger.start().unwrap();
        assert_eq!(messenger.state(), MessengerState::Listening);
        assert!(matches!(messenger.start(), Err(BridgeError::AlreadyStarted)));

        messenger.signal_ready(&cart());
        assert_eq!(messenger.state(), MessengerState::AwaitingPeerAck);

        let inbound = messenger.receive(PAY, &json!({ "type": "cart-ready", "source": "frame" }));
        assert!(matches!(inbound, Inbound::Accepted(_)));
        assert_eq!(messenger.state(), MessengerState::Ready);
        assert!(*rx.borrow());

        messenger.request_cart();
        assert_eq!(messenger.state(), MessengerState::AwaitingPeerAck);
    }

    #[test]
    fn test_not_listening_ignores() {
        let mut messenger = Messenger::new("host", allowlist());
        let inbound = messenger.receive(PAY, &json!({ "type": "cart-ready" }));
        assert!(matches!(inbound, Inbound::Ignored(_)));
    }

    #[test]
    fn test_untrusted_origin_rejected() {
        let mut messenger = Messenger::new("host", allowlist());
        messenger.start().unwrap();

        let inbound = messenger.receive(
            "https://evil.test",
            &json!({ "type": "push-cart-data", "cart": [{ "sku": "x" }] }),
        );
        assert!(matches!(inbound, Inbound::Rejected(_)));
        assert_eq!(messenger.state(), MessengerState::Listening);
    }

    #[test]
    fn test_unknown_type_ignored_and_malformed_rejected() {
        let mut messenger = Messenger::new("host", allowlist());
        messenger.start().unwrap();

        assert!(matches!(
            messenger.receive(PAY, &json!({ "type": "resize", "height": 300 })),
            Inbound::Ignored(_)
        ));
        assert!(matches!(
            messenger.receive(PAY, &json!(["not", "an", "object"])),
            Inbound::Rejected(_)
        ));
    }

    #[test]
    fn test_own_echo_ignored() {
        let mut messenger = Messenger::new("host", allowlist());
        messenger.start().unwrap();
        let echo = CartMessage::push_snapshot(&cart()).to_value();
        assert!(matches!(messenger.receive(SHOP, &echo), Inbound::Ignored(_)));
    }

    #[test]
    fn test_outbound_messages_carry_messenger_source() {
        let frame = RecordingTarget::new(TargetKind::Frame, PAY);
        let mut messenger = Messenger::new("host", allowlist()).with_target(frame.clone());
        messenger.start().unwrap();

        let mut merged = cart();
        merged.source = "checkout-frame".to_string();
        messenger.signal_ready(&merged);
        messenger.push_cart(&merged);
        messenger.notify(MessageType::CartAck);

        let sources: Vec<_> = frame.sent().iter().map(|m| m["source"].clone()).collect();
        assert_eq!(sources, vec![json!("host"), json!("host"), json!("host")]);
        assert_eq!(frame.sent_types(), vec!["cart-ready", "push-cart-data", "cart-ack"]);
    }

    #[test]
    fn test_notify_refuses_payload_kinds() {
        let frame = RecordingTarget::new(TargetKind::Frame, PAY);
        let messenger = Messenger::new("host", allowlist()).with_target(frame.clone());
        assert_eq!(messenger.notify(MessageType::PushCartData), BroadcastReport::default());
        assert!(frame.sent().is_empty());
    }

    #[test]
    fn test_announce_cleared_stamps_cart_time() {
        let frame = RecordingTarget::new(TargetKind::Frame, PAY);
        let messenger = Messenger::new("host", allowlist()).with_target(frame.clone());
        let mut emptied = cart();
        emptied.clear();

        messenger.announce_cleared(&emptied, false);
        messenger.announce_cleared(&emptied, true);

        assert_eq!(frame.sent_types(), vec!["clear-cart", "order-completed"]);
        for wire in frame.sent() {
            let parsed = CartMessage::parse(&wire).unwrap();
            assert_eq!(parsed.cleared_at(), Some(emptied.timestamp));
        }
    }

    #[test]
    fn test_broadcast_fans_out_to_allowed_targets() {
        let own = RecordingTarget::new(TargetKind::SelfWindow, SHOP);
        let parent = RecordingTarget::new(TargetKind::Parent, SHOP);
        let frame = RecordingTarget::new(TargetKind::Frame, PAY);
        let stranger = RecordingTarget::new(TargetKind::Frame, "https://ads.example.net");

        let messenger = Messenger::new("host", allowlist())
            .with_target(own.clone())
            .with_target(parent.clone())
            .with_target(frame.clone())
            .with_target(stranger.clone());

        let report = messenger.broadcast(&CartMessage::push_snapshot(&cart()));

        assert_eq!(report, BroadcastReport { delivered: 3, skipped: 1, failed: 0 });
        assert_eq!(own.sent_types(), vec!["push-cart-data"]);
        assert_eq!(parent.sent_types(), vec!["push-cart-data"]);
        assert_eq!(frame.sent_types(), vec!["push-cart-data"]);
        assert!(stranger.sent().is_empty());
        assert!(messenger.has_parent());
    }
}
