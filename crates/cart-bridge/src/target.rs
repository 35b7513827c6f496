//! Message recipients.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{BridgeError, BridgeResult};

/// Where a recipient sits relative to the sending context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// The sending context's own window.
    SelfWindow,
    /// The embedding parent window.
    Parent,
    /// An embedded iframe.
    Frame,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::SelfWindow => write!(f, "self"),
            TargetKind::Parent => write!(f, "parent"),
            TargetKind::Frame => write!(f, "frame"),
        }
    }
}

/// A window a message can be posted to.
///
/// In a browser binding this wraps `window.postMessage(data, origin)`; the
/// origin passed to `post` is always the recipient's concrete origin.
pub trait MessageTarget: Send + Sync {
    fn kind(&self) -> TargetKind;

    /// Origin of the recipient window.
    fn origin(&self) -> &str;

    fn post(&self, message: &Value) -> BridgeResult<()>;
}

/// A message as received by a context: payload plus the sender's origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub origin: String,
    pub data: Value,
}

/// Target that forwards into another context's inbox.
///
/// Used to wire contexts together in-process.
pub struct ChannelTarget {
    kind: TargetKind,
    origin: String,
    sender_origin: String,
    tx: mpsc::UnboundedSender<Delivery>,
}

impl ChannelTarget {
    /// `origin` is the recipient's origin, `sender_origin` the origin the
    /// recipient will see on delivered messages.
    pub fn new(
        kind: TargetKind,
        origin: impl Into<String>,
        sender_origin: impl Into<String>,
        tx: mpsc::UnboundedSender<Delivery>,
    ) -> Self {
        Self {
            kind,
            origin: origin.into(),
            sender_origin: sender_origin.into(),
            tx,
        }
    }
}

impl MessageTarget for ChannelTarget {
    fn kind(&self) -> TargetKind {
        self.kind
    }

    fn origin(&self) -> &str {
        &self.origin
    }

    fn post(&self, message: &Value) -> BridgeResult<()> {
        self.tx
            .send(Delivery {
                origin: self.sender_origin.clone(),
                data: message.clone(),
            })
            .map_err(|_| BridgeError::Delivery {
                target: self.origin.clone(),
                reason: "recipient context is gone".to_string(),
            })
    }
}

/// Target that records every posted message.
#[derive(Clone)]
pub struct RecordingTarget {
    kind: TargetKind,
    origin: String,
    sent: Arc<Mutex<Vec<Value>>>,
}

impl RecordingTarget {
    pub fn new(kind: TargetKind, origin: impl Into<String>) -> Self {
        Self {
            kind,
            origin: origin.into(),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Messages posted so far.
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Type tags of messages posted so far.
    pub fn sent_types(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|m| m.get("type").and_then(Value::as_str).map(str::to_string))
            .collect()
    }
}

impl MessageTarget for RecordingTarget {
    fn kind(&self) -> TargetKind {
        self.kind
    }

    fn origin(&self) -> &str {
        &self.origin
    }

    fn post(&self, message: &Value) -> BridgeResult<()> {
        self.sent
            .lock()
            .map_err(|e| BridgeError::Delivery {
                target: self.origin.clone(),
                reason: e.to_string(),
            })?
            .push(message.clone());
        Ok(())
    }
}
