//! Storage error types.

use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend cannot be used at all (disabled, privacy mode).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Write rejected because the backend is full.
    #[error("Storage quota exceeded for key {0}")]
    QuotaExceeded(String),

    /// Stored value could not be parsed.
    #[error("Malformed value under {key}: {reason}")]
    Malformed { key: String, reason: String },

    /// Failed to serialize value.
    #[error("Failed to encode cart: {0}")]
    Serialize(#[from] cart_core::CartError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_core::CartError;

    #[test]
    fn test_cart_errors_become_serialize_errors() {
        let err = StorageError::from(CartError::SerializationError("non-finite price".into()));
        assert!(matches!(err, StorageError::Serialize(_)));
        assert_eq!(err.to_string(), "Failed to encode cart: Serialization error: non-finite price");
    }
}
