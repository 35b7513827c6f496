//! Storage backends.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::StorageError;

/// Which of the two browser stores a backend stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Cleared when the browsing session ends.
    Session,
    /// Survives across sessions.
    Local,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Session => "session",
            StorageKind::Local => "local",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string key-value store that may fail on any call.
///
/// Implemented over `sessionStorage`/`localStorage` in a browser binding and
/// by [`MemoryBackend`] natively.
pub trait StorageBackend: Send + Sync {
    /// Read a raw value. Missing keys are `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a raw value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process backend.
///
/// Clones share the same map, so a test can keep a handle and inspect what
/// the adapter wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-filled with entries.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Arc::new(Mutex::new(map)),
        }
    }

    /// Copy of every stored entry.
    pub fn entries(&self) -> HashMap<String, String> {
        self.entries
            .lock()
            .map(|map| map.clone())
            .unwrap_or_default()
    }

    fn with_map<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, String>) -> T,
    ) -> Result<T, StorageError> {
        let mut map = self
            .entries
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(f(&mut map))
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_map(|map| map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_map(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.with_map(|map| {
            map.remove(key);
        })
    }
}

/// Backend that fails every call, standing in for disabled storage.
#[derive(Debug, Clone, Default)]
pub struct FailingBackend {
    reason: String,
}

impl FailingBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl StorageBackend for FailingBackend {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::QuotaExceeded(key.to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_roundtrip() {
        let backend = MemoryBackend::new();
        backend.set("cart", "[]").unwrap();
        assert_eq!(backend.get("cart").unwrap().as_deref(), Some("[]"));

        backend.remove("cart").unwrap();
        assert_eq!(backend.get("cart").unwrap(), None);
        backend.remove("cart").unwrap();
    }

    #[test]
    fn test_memory_clones_share_state() {
        let backend = MemoryBackend::new();
        let handle = backend.clone();
        backend.set("k", "v").unwrap();
        assert_eq!(handle.entries().get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn test_with_entries() {
        let backend = MemoryBackend::with_entries([("a", "1"), ("b", "2")]);
        assert_eq!(backend.entries().len(), 2);
    }

    #[test]
    fn test_failing_backend() {
        let backend = FailingBackend::new("private mode");
        assert!(backend.get("k").is_err());
        assert!(matches!(
            backend.set("k", "v"),
            Err(StorageError::QuotaExceeded(_))
        ));
        assert!(backend.remove("k").is_err());
    }

    #[test]
    fn test_storage_kind_display() {
        assert_eq!(StorageKind::Session.to_string(), "session");
        assert_eq!(StorageKind::Local.to_string(), "local");
    }
}
