//! Fan-out persistence adapter.

use cart_core::{Cart, PersistedEnvelope};
use serde_json::Value;

use crate::backend::{StorageBackend, StorageKind};
use crate::keys::StorageKeys;
use crate::StorageError;

/// Outcome of a [`PersistenceAdapter::save`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Writes that succeeded.
    pub written: usize,
    /// Writes that failed.
    pub failed: usize,
    /// Whether the cart is only held in memory because every write failed.
    pub memory_only: bool,
}

impl SaveReport {
    /// Whether some backend or key missed this write.
    pub fn degraded(&self) -> bool {
        self.failed > 0 || self.memory_only
    }
}

/// Reads and writes the canonical cart under every key of both backends.
///
/// No operation returns an error: backend failures are logged and skipped.
/// Whenever a write misses any key the cart is also kept in memory, and that
/// copy outranks storage until the next clean save or clear, so an older
/// stored cart never shadows a newer one.
pub struct PersistenceAdapter {
    keys: StorageKeys,
    backends: Vec<(StorageKind, Box<dyn StorageBackend>)>,
    memory: Option<Cart>,
}

impl PersistenceAdapter {
    /// Create an adapter over a session and a local backend.
    pub fn new(
        keys: StorageKeys,
        session: impl StorageBackend + 'static,
        local: impl StorageBackend + 'static,
    ) -> Self {
        Self {
            keys,
            backends: vec![
                (StorageKind::Session, Box::new(session)),
                (StorageKind::Local, Box::new(local)),
            ],
            memory: None,
        }
    }

    /// The key list in use.
    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Write the cart under every key in both backends.
    ///
    /// All successful writes carry the same bytes.
    pub fn save(&mut self, cart: &Cart) -> SaveReport {
        let mut report = SaveReport::default();

        let payload = match PersistedEnvelope::from_cart(cart)
            .to_json()
            .map_err(StorageError::from)
        {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize cart, keeping it in memory");
                self.memory = Some(cart.clone());
                report.memory_only = true;
                return report;
            }
        };

        for (kind, backend) in &self.backends {
            for key in self.keys.iter() {
                match backend.set(key, &payload) {
                    Ok(()) => report.written += 1,
                    Err(e) => {
                        tracing::warn!(backend = %kind, key, error = %e, "cart write failed");
                        report.failed += 1;
                    }
                }
            }
        }

        if report.written == 0 {
            tracing::warn!("no storage backend accepted the cart, keeping it in memory");
            report.memory_only = true;
        }
        self.memory = report.degraded().then(|| cart.clone());

        tracing::debug!(
            written = report.written,
            failed = report.failed,
            items = cart.len(),
            "cart saved"
        );
        report
    }

    /// Load the current cart.
    ///
    /// A cart held in memory after a degraded save is the newest one and
    /// wins. Otherwise the first non-empty cart found is returned, scanning
    /// keys in priority order and, per key, the session backend before the
    /// local one.
    pub fn load(&self) -> Option<Cart> {
        if let Some(cart) = &self.memory {
            return (!cart.is_empty()).then(|| cart.clone());
        }

        for key in self.keys.iter() {
            for (kind, backend) in &self.backends {
                match read_cart(backend.as_ref(), key) {
                    Ok(Some(cart)) if !cart.is_empty() => {
                        tracing::debug!(backend = %kind, key, items = cart.len(), "cart loaded");
                        return Some(cart);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(backend = %kind, key, error = %e, "skipping unreadable cart");
                    }
                }
            }
        }

        None
    }

    /// Remove the cart from every key in both backends.
    ///
    /// Returns the number of successful removals. If any removal fails, an
    /// empty cart is held in memory so a leftover stored cart is not loaded.
    pub fn clear(&mut self) -> usize {
        let mut removed = 0;
        let mut failed = 0;
        for (kind, backend) in &self.backends {
            for key in self.keys.iter() {
                match backend.remove(key) {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        tracing::warn!(backend = %kind, key, error = %e, "cart removal failed");
                        failed += 1;
                    }
                }
            }
        }

        self.memory = (failed > 0).then(|| Cart::pristine("memory"));
        removed
    }
}

fn read_cart(backend: &dyn StorageBackend, key: &str) -> Result<Option<Cart>, StorageError> {
    let Some(raw) = backend.get(key)? else {
        return Ok(None);
    };

    let value: Value = serde_json::from_str(&raw).map_err(|e| StorageError::Malformed {
        key: key.to_string(),
        reason: e.to_string(),
    })?;

    let source = value
        .get("source")
        .and_then(Value::as_str)
        .unwrap_or(key)
        .to_string();
    Ok(Cart::from_value(&value, source))
}
