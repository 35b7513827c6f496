//! Cross-context message types.
//!
//! Wire format (JSON, via window messaging):
//!
//! ```text
//! { type, data?, cart?, cartItems?, timestamp?, source?, snapshot? }
//! ```
//!
//! Inbound messages are validated into [`CartMessage`] at the boundary;
//! handlers never look at raw JSON.

use std::fmt;

use cart_core::{extract_timestamp, normalize_value, Cart, CartItem, Incoming, PersistedEnvelope};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::error::{BridgeError, BridgeResult};

/// Recognized message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Ask peers to push their cart.
    RequestCart,
    /// A cart (partial or snapshot) pushed to peers.
    PushCartData,
    /// Handshake signal, optionally carrying the sender's cart.
    CartReady,
    /// Acknowledges a peer's ready signal.
    CartAck,
    /// Checkout started; carries the final cart.
    CheckoutInitiated,
    /// Payment went through; carts must be cleared.
    OrderCompleted,
    /// User emptied the cart.
    ClearCart,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::RequestCart => "request-cart",
            MessageType::PushCartData => "push-cart-data",
            MessageType::CartReady => "cart-ready",
            MessageType::CartAck => "cart-ack",
            MessageType::CheckoutInitiated => "checkout-initiated",
            MessageType::OrderCompleted => "order-completed",
            MessageType::ClearCart => "clear-cart",
        }
    }

    /// Parse a type tag. Case and `_`/`-` separators are ignored, so
    /// `CART_READY` and `cart-ready` are the same type.
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_lowercase().replace('_', "-");
        match tag.as_str() {
            "request-cart" => Some(MessageType::RequestCart),
            "push-cart-data" => Some(MessageType::PushCartData),
            "cart-ready" => Some(MessageType::CartReady),
            "cart-ack" => Some(MessageType::CartAck),
            "checkout-initiated" => Some(MessageType::CheckoutInitiated),
            "order-completed" => Some(MessageType::OrderCompleted),
            "clear-cart" => Some(MessageType::ClearCart),
            _ => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cart contents carried by a message.
#[derive(Debug, Clone, PartialEq)]
pub struct CartPayload {
    /// Normalized items.
    pub items: Vec<CartItem>,
    /// Sender's cart mutation time.
    pub timestamp: Option<DateTime<Utc>>,
    /// Whether `items` is the sender's complete cart.
    pub snapshot: bool,
}

impl CartPayload {
    /// Complete snapshot of a cart.
    pub fn snapshot(cart: &Cart) -> Self {
        Self {
            items: cart.items.clone(),
            timestamp: Some(cart.timestamp),
            snapshot: true,
        }
    }

    /// Turn into a reconciler input.
    pub fn into_incoming(self, source: impl Into<String>) -> Incoming {
        Incoming {
            items: self.items,
            timestamp: self.timestamp,
            snapshot: self.snapshot,
            source: source.into(),
        }
    }

    fn to_value(&self, source: &str) -> Value {
        let cart = Cart {
            items: self.items.clone(),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            source: source.to_string(),
        };
        serde_json::to_value(PersistedEnvelope::from_cart(&cart)).unwrap_or(Value::Null)
    }

    fn from_message(obj: &Map<String, Value>, snapshot: bool) -> Option<Self> {
        let value = Value::Object(obj.clone());
        let items = normalize_value(&value)?;
        let timestamp = extract_timestamp(&value);
        Some(Self {
            items,
            timestamp,
            snapshot,
        })
    }
}

/// A validated cross-context message.
#[derive(Debug, Clone, PartialEq)]
pub enum CartMessage {
    RequestCart { source: String },
    PushCartData { payload: CartPayload, source: String },
    CartReady { payload: Option<CartPayload>, source: String },
    CartAck { source: String },
    CheckoutInitiated { payload: CartPayload, source: String },
    /// `at` is when the sender cleared its cart; a clear older than the
    /// receiver's cart is stale.
    OrderCompleted { source: String, at: Option<DateTime<Utc>> },
    ClearCart { source: String, at: Option<DateTime<Utc>> },
}

impl CartMessage {
    /// Push a complete cart.
    pub fn push_snapshot(cart: &Cart) -> Self {
        CartMessage::PushCartData {
            payload: CartPayload::snapshot(cart),
            source: cart.source.clone(),
        }
    }

    /// Ready signal carrying the sender's cart.
    pub fn ready(cart: &Cart) -> Self {
        CartMessage::CartReady {
            payload: Some(CartPayload {
                snapshot: false,
                ..CartPayload::snapshot(cart)
            }),
            source: cart.source.clone(),
        }
    }

    /// Attribute the message to `sender`.
    pub fn sent_by(mut self, sender: &str) -> Self {
        match &mut self {
            CartMessage::RequestCart { source }
            | CartMessage::PushCartData { source, .. }
            | CartMessage::CartReady { source, .. }
            | CartMessage::CartAck { source }
            | CartMessage::CheckoutInitiated { source, .. }
            | CartMessage::OrderCompleted { source, .. }
            | CartMessage::ClearCart { source, .. } => *source = sender.to_string(),
        }
        self
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            CartMessage::RequestCart { .. } => MessageType::RequestCart,
            CartMessage::PushCartData { .. } => MessageType::PushCartData,
            CartMessage::CartReady { .. } => MessageType::CartReady,
            CartMessage::CartAck { .. } => MessageType::CartAck,
            CartMessage::CheckoutInitiated { .. } => MessageType::CheckoutInitiated,
            CartMessage::OrderCompleted { .. } => MessageType::OrderCompleted,
            CartMessage::ClearCart { .. } => MessageType::ClearCart,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            CartMessage::RequestCart { source }
            | CartMessage::PushCartData { source, .. }
            | CartMessage::CartReady { source, .. }
            | CartMessage::CartAck { source }
            | CartMessage::CheckoutInitiated { source, .. }
            | CartMessage::OrderCompleted { source, .. }
            | CartMessage::ClearCart { source, .. } => source,
        }
    }

    /// Cart contents, if the message carries any.
    pub fn payload(&self) -> Option<&CartPayload> {
        match self {
            CartMessage::PushCartData { payload, .. }
            | CartMessage::CheckoutInitiated { payload, .. } => Some(payload),
            CartMessage::CartReady { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }

    /// Validate a raw inbound message.
    ///
    /// `push-cart-data` is a partial update unless it sets `snapshot: true`;
    /// `checkout-initiated` always carries the complete cart. A ready signal
    /// without items is still a valid ready signal.
    pub fn parse(raw: &Value) -> BridgeResult<Self> {
        let obj = raw.as_object().ok_or(BridgeError::NotAnObject)?;
        let tag = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(BridgeError::MissingType)?;
        let kind = MessageType::parse(tag).ok_or_else(|| BridgeError::UnknownType(tag.to_string()))?;

        let source = obj
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let snapshot_flag = obj
            .get("snapshot")
            .or_else(|| obj.get("data").and_then(|d| d.get("snapshot")))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let require_payload = |snapshot: bool| {
            CartPayload::from_message(obj, snapshot)
                .ok_or_else(|| BridgeError::MissingPayload(kind.to_string()))
        };

        Ok(match kind {
            MessageType::RequestCart => CartMessage::RequestCart { source },
            MessageType::PushCartData => CartMessage::PushCartData {
                payload: require_payload(snapshot_flag)?,
                source,
            },
            MessageType::CartReady => CartMessage::CartReady {
                payload: CartPayload::from_message(obj, snapshot_flag),
                source,
            },
            MessageType::CartAck => CartMessage::CartAck { source },
            MessageType::CheckoutInitiated => CartMessage::CheckoutInitiated {
                payload: require_payload(true)?,
                source,
            },
            MessageType::OrderCompleted => CartMessage::OrderCompleted {
                source,
                at: extract_timestamp(raw),
            },
            MessageType::ClearCart => CartMessage::ClearCart {
                source,
                at: extract_timestamp(raw),
            },
        })
    }

    /// When the sender cleared its cart, for clearing messages.
    pub fn cleared_at(&self) -> Option<DateTime<Utc>> {
        match self {
            CartMessage::OrderCompleted { at, .. } | CartMessage::ClearCart { at, .. } => *at,
            _ => None,
        }
    }

    /// Serialize to the wire format.
    pub fn to_value(&self) -> Value {
        let timestamp = self.cleared_at().unwrap_or_else(Utc::now);
        let mut obj = json!({
            "type": self.message_type().as_str(),
            "source": self.source(),
            "timestamp": timestamp.to_rfc3339(),
        });

        if let Some(payload) = self.payload() {
            let data = payload.to_value(self.source());
            obj["cart"] = data["items"].clone();
            obj["data"] = data;
            obj["snapshot"] = Value::Bool(payload.snapshot);
        }

        obj
    }
}
