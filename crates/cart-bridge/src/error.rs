//! Bridge error types.

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors from message parsing, origin checks and delivery.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BridgeError {
    #[error("message has no type tag")]
    MissingType,

    #[error("unrecognized message type: {0}")]
    UnknownType(String),

    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("message payload has no item list: {0}")]
    MissingPayload(String),

    #[error("origin not allowed: {0}")]
    OriginNotAllowed(String),

    #[error("invalid origin: {0}")]
    InvalidOrigin(String),

    #[error("delivery to {target} failed: {reason}")]
    Delivery { target: String, reason: String },

    #[error("messenger already started")]
    AlreadyStarted,
}
