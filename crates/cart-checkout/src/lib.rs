//! Checkout handoff to the external payment origin.
//!
//! This crate provides:
//! - `CheckoutHandoff` - Persist, broadcast, then navigate to the payment page
//! - `build_handoff_url` / `parse_handoff_url` - The `?cart=...&t=...` contract
//! - `Navigator`, `UserNotice`, `CheckoutNotifier` - Host-side collaborators
//! - `RecordingNavigator`, `RecordingNotice` - In-process collaborators for tests and tools

mod error;
mod handoff;
mod handoff_url;
mod record;

pub use error::*;
pub use handoff::*;
pub use handoff_url::*;
pub use record::*;
