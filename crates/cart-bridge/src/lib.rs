//! Cross-context cart messaging.
//!
//! This crate provides:
//! - `CartMessage` - Tagged union of every message contexts exchange
//! - `OriginAllowlist` - Origin filtering for inbound and outbound messages
//! - `HandshakeSchedule` / `run_handshake` - Bounded ready-signal retries
//! - `Messenger` - Per-context state machine with fan-out broadcast
//! - `MessageTarget` - Recipient abstraction (own window, parent, iframes)

mod error;
mod handshake;
mod message;
mod messenger;
mod origin;
mod target;

pub use error::*;
pub use handshake::*;
pub use message::*;
pub use messenger::*;
pub use origin::*;
pub use target::*;
