//! Checkout error types.

/// Errors from the checkout handoff.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid payment URL: {0}")]
    InvalidPaymentUrl(String),

    #[error("handoff URL has no cart parameter")]
    MissingCartParam,

    #[error("invalid cart parameter: {0}")]
    InvalidCartParam(String),

    #[error("checkout notification failed: {0}")]
    Notification(#[from] anyhow::Error),
}
