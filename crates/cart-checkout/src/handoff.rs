//! Checkout handoff.
//!
//! Ordered steps, each allowed to fail without stopping the next:
//!
//! 1. persist the final cart
//! 2. broadcast a `checkout-initiated` snapshot to any listening payment frame
//! 3. build the payment URL
//! 4. navigate after a short fixed delay, so the broadcast leaves the event
//!    loop before the page unloads
//!
//! A backend notification runs alongside the delay. It is best-effort: its
//! failure or timeout never blocks navigation.

use std::time::Duration;

use async_trait::async_trait;
use cart_bridge::{BroadcastReport, CartMessage, CartPayload, Messenger};
use cart_core::{Cart, PersistedEnvelope};
use cart_store::PersistenceAdapter;
use chrono::Utc;

use crate::error::CheckoutError;
use crate::handoff_url::build_handoff_url;

/// Message shown when checkout is attempted with nothing in the cart.
pub const EMPTY_CART_MESSAGE: &str = "Your cart is empty. Add a product before checking out.";

/// Moves the top-level window.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// Shows user-visible errors (toast, alert).
pub trait UserNotice: Send + Sync {
    fn error(&self, message: &str);
}

/// Optional backend hook told that a checkout started.
#[async_trait]
pub trait CheckoutNotifier: Send + Sync {
    async fn checkout_started(&self, cart: &PersistedEnvelope) -> anyhow::Result<()>;
}

/// Handoff settings.
#[derive(Debug, Clone)]
pub struct HandoffConfig {
    /// Payment page the cart is handed to.
    pub payment_url: String,
    /// Wait between broadcast and navigation.
    pub navigation_delay: Duration,
    /// Upper bound for the backend notification.
    pub notify_timeout: Duration,
}

impl HandoffConfig {
    pub fn new(payment_url: impl Into<String>) -> Self {
        Self {
            payment_url: payment_url.into(),
            navigation_delay: Duration::from_millis(300),
            notify_timeout: Duration::from_millis(1500),
        }
    }

    pub fn with_navigation_delay(mut self, delay: Duration) -> Self {
        self.navigation_delay = delay;
        self
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }
}

/// How a checkout attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// The window was sent to the payment page.
    Navigated { url: String },
    /// Nothing to check out; the user was told.
    EmptyCart,
    /// The payment URL could not be built; the user was told.
    Failed { reason: String },
}

impl CheckoutOutcome {
    pub fn is_navigated(&self) -> bool {
        matches!(self, CheckoutOutcome::Navigated { .. })
    }
}

/// Hands the final cart to the payment origin.
pub struct CheckoutHandoff {
    config: HandoffConfig,
    navigator: Box<dyn Navigator>,
    notice: Box<dyn UserNotice>,
    notifier: Option<Box<dyn CheckoutNotifier>>,
}

impl CheckoutHandoff {
    pub fn new(
        config: HandoffConfig,
        navigator: impl Navigator + 'static,
        notice: impl UserNotice + 'static,
    ) -> Self {
        Self {
            config,
            navigator: Box::new(navigator),
            notice: Box::new(notice),
            notifier: None,
        }
    }

    /// Attach a backend notifier.
    pub fn with_notifier(mut self, notifier: impl CheckoutNotifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    pub fn config(&self) -> &HandoffConfig {
        &self.config
    }

    /// Run the checkout handoff.
    pub async fn initiate(
        &self,
        cart: &Cart,
        store: &mut PersistenceAdapter,
        messenger: &Messenger,
    ) -> CheckoutOutcome {
        if cart.is_empty() {
            tracing::info!("checkout attempted with an empty cart");
            self.notice.error(EMPTY_CART_MESSAGE);
            return CheckoutOutcome::EmptyCart;
        }

        let report = store.save(cart);
        if report.memory_only {
            tracing::warn!("final cart could not be persisted, continuing with URL handoff");
        }

        let broadcast = self.broadcast_snapshot(cart, messenger);
        tracing::debug!(delivered = broadcast.delivered, "checkout snapshot broadcast");

        let url = match build_handoff_url(
            &self.config.payment_url,
            &cart.items,
            Utc::now().timestamp_millis(),
        ) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(error = %e, "cannot build payment URL");
                self.notice.error("Checkout is unavailable right now. Please try again.");
                return CheckoutOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let envelope = PersistedEnvelope::from_cart(cart);
        tokio::join!(
            self.notify_backend(&envelope),
            tokio::time::sleep(self.config.navigation_delay)
        );

        tracing::info!(items = cart.len(), total = cart.total_amount(), "navigating to payment page");
        self.navigator.navigate(&url);
        CheckoutOutcome::Navigated { url }
    }

    fn broadcast_snapshot(&self, cart: &Cart, messenger: &Messenger) -> BroadcastReport {
        messenger.broadcast(&CartMessage::CheckoutInitiated {
            payload: CartPayload::snapshot(cart),
            source: messenger.source().to_string(),
        })
    }

    async fn notify_backend(&self, envelope: &PersistedEnvelope) {
        let Some(notifier) = &self.notifier else {
            return;
        };

        let result = tokio::time::timeout(self.config.notify_timeout, notifier.checkout_started(envelope)).await;
        match result {
            Ok(Ok(())) => tracing::debug!("backend notified of checkout"),
            Ok(Err(e)) => {
                let e = CheckoutError::from(e);
                tracing::warn!(error = %e, "checkout notification failed, proceeding");
            }
            Err(_) => tracing::warn!(
                timeout_ms = self.config.notify_timeout.as_millis() as u64,
                "checkout notification timed out, proceeding"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_bridge::{OriginAllowlist, RecordingTarget, TargetKind};
    use cart_core::CartItem;
    use cart_store::{FailingBackend, MemoryBackend, StorageKeys};
    use crate::record::{RecordingNavigator, RecordingNotice};

    const PAY: &str = "https://pay.example.com";

    struct FailingNotifier;

    #[async_trait]
    impl CheckoutNotifier for FailingNotifier {
        async fn checkout_started(&self, _cart: &PersistedEnvelope) -> anyhow::Result<()> {
            anyhow::bail!("backend returned 503")
        }
    }

    struct HangingNotifier;

    #[async_trait]
    impl CheckoutNotifier for HangingNotifier {
        async fn checkout_started(&self, _cart: &PersistedEnvelope) -> anyhow::Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn cart() -> Cart {
        let mut cart = Cart::new("host");
        cart.add_item(CartItem::new("a", "A", 100.0, 1));
        cart
    }

    type Setup = (
        CheckoutHandoff,
        RecordingNavigator,
        RecordingNotice,
        Messenger,
        RecordingTarget,
        PersistenceAdapter,
        MemoryBackend,
    );

    fn setup() -> Setup {
        let nav = RecordingNavigator::new();
        let notice = RecordingNotice::new();
        let handoff = CheckoutHandoff::new(
            HandoffConfig::new(format!("{PAY}/checkout")),
            nav.clone(),
            notice.clone(),
        );
        let frame = RecordingTarget::new(TargetKind::Frame, PAY);
        let messenger = Messenger::new("host", OriginAllowlist::new().allow_origin(PAY)).with_target(frame.clone());
        let local = MemoryBackend::new();
        let store = PersistenceAdapter::new(StorageKeys::default(), MemoryBackend::new(), local.clone());
        (handoff, nav, notice, messenger, frame, store, local)
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_cart_blocks_navigation() {
        let (handoff, nav, notice, messenger, frame, mut store, local) = setup();

        let outcome = handoff.initiate(&Cart::new("host"), &mut store, &messenger).await;

        assert_eq!(outcome, CheckoutOutcome::EmptyCart);
        assert!(nav.urls().is_empty());
        assert_eq!(notice.messages(), vec![EMPTY_CART_MESSAGE.to_string()]);
        assert!(frame.sent().is_empty());
        assert!(local.entries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkout_persists_broadcasts_and_navigates() {
        let (handoff, nav, notice, messenger, frame, mut store, local) = setup();

        let outcome = handoff.initiate(&cart(), &mut store, &messenger).await;

        assert!(outcome.is_navigated());
        assert!(local.entries().contains_key("turbo_cart"));
        assert_eq!(frame.sent_types(), vec!["checkout-initiated"]);
        assert!(notice.messages().is_empty());

        let urls = nav.urls();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].starts_with("https://pay.example.com/checkout?cart="));
        assert!(urls[0].contains("&t="));
        assert_eq!(crate::parse_handoff_url(&urls[0]).unwrap(), cart().items);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_waits_for_delay() {
        let (handoff, nav, _, messenger, _, mut store, _) = setup();
        let start = tokio::time::Instant::now();

        handoff.initiate(&cart(), &mut store, &messenger).await;

        assert!(start.elapsed() >= Duration::from_millis(300));
        assert_eq!(nav.urls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifier_failure_does_not_block() {
        let (handoff, nav, _, messenger, _, mut store, _) = setup();
        let handoff = handoff.with_notifier(FailingNotifier);

        assert!(handoff.initiate(&cart(), &mut store, &messenger).await.is_navigated());
        assert_eq!(nav.urls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_notifier_times_out() {
        let (handoff, nav, _, messenger, _, mut store, _) = setup();
        let handoff = handoff.with_notifier(HangingNotifier);
        let start = tokio::time::Instant::now();

        assert!(handoff.initiate(&cart(), &mut store, &messenger).await.is_navigated());
        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert_eq!(nav.urls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_failure_does_not_block() {
        let (handoff, nav, _, messenger, _, _, _) = setup();
        let mut store = PersistenceAdapter::new(
            StorageKeys::default(),
            FailingBackend::new("disabled"),
            FailingBackend::new("disabled"),
        );

        assert!(handoff.initiate(&cart(), &mut store, &messenger).await.is_navigated());
        assert_eq!(nav.urls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_payment_url_reports_failure() {
        let nav = RecordingNavigator::new();
        let notice = RecordingNotice::new();
        let handoff = CheckoutHandoff::new(HandoffConfig::new("::not a url::"), nav.clone(), notice.clone());
        let messenger = Messenger::new("host", OriginAllowlist::new());
        let mut store = PersistenceAdapter::new(StorageKeys::default(), MemoryBackend::new(), MemoryBackend::new());

        let outcome = handoff.initiate(&cart(), &mut store, &messenger).await;

        assert!(matches!(outcome, CheckoutOutcome::Failed { .. }));
        assert!(nav.urls().is_empty());
        assert_eq!(notice.messages().len(), 1);
    }
}
