//! Multi-key, multi-backend cart persistence.
//!
//! Every context, whatever script version it runs, must find the same cart.
//! The adapter writes one serialized envelope under a primary key and a list
//! of legacy keys, in both the session and the local backend, and reads them
//! back in priority order.
//!
//! # Example
//!
//! ```rust,ignore
//! use cart_store::{MemoryBackend, PersistenceAdapter, StorageKeys};
//!
//! let mut store = PersistenceAdapter::new(
//!     StorageKeys::default(),
//!     MemoryBackend::new(),
//!     MemoryBackend::new(),
//! );
//!
//! store.save(&cart);
//! let restored = store.load();
//! store.clear();
//! ```

mod adapter;
mod backend;
mod error;
mod keys;

pub use adapter::{PersistenceAdapter, SaveReport};
pub use backend::{FailingBackend, MemoryBackend, StorageBackend, StorageKind};
pub use error::StorageError;
pub use keys::{StorageKeys, LEGACY_KEYS, PRIMARY_KEY};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{MemoryBackend, PersistenceAdapter, StorageBackend, StorageError, StorageKeys};
}
