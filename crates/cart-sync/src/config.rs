//! Sync configuration.
//!
//! Loaded from `cart-sync.toml` (or a `.json` file with the same shape).
//! Every field has a default, so an empty file is a valid config.

use std::path::Path;
use std::time::Duration;

use cart_bridge::{parse_origin, HandshakeSchedule, OriginAllowlist};
use cart_checkout::HandoffConfig;
use cart_store::{StorageKeys, LEGACY_KEYS, PRIMARY_KEY};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Config file names searched for by default.
pub const CONFIG_FILE_NAMES: &[&str] = &["cart-sync.toml", ".cart-sync.toml", "cart-sync.json"];

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse JSON config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Sync configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Storage key layout.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Trusted peer origins.
    #[serde(default)]
    pub origins: OriginConfig,

    /// Ready-signal retries.
    #[serde(default)]
    pub handshake: HandshakeConfig,

    /// Payment handoff.
    #[serde(default)]
    pub checkout: CheckoutConfig,
}

impl SyncConfig {
    /// Load config from a file. `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;

        let config: SyncConfig = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|source| ConfigError::Json { path: display, source })?
        } else {
            toml::from_str(&content).map_err(|source| ConfigError::Toml { path: display, source })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Look for a config file in `dir` and its parents.
    pub fn discover(dir: impl AsRef<Path>) -> Option<std::path::PathBuf> {
        let mut current = Some(dir.as_ref());
        while let Some(dir) = current {
            for name in CONFIG_FILE_NAMES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
            current = dir.parent();
        }
        None
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.storage.primary_key.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.primary_key must not be empty".into()));
        }

        for origin in &self.origins.allowed {
            if origin.trim() == "*" {
                return Err(ConfigError::Invalid(
                    "origins.allowed must list concrete origins, \"*\" is not accepted".into(),
                ));
            }
            parse_origin(origin).map_err(|e| {
                ConfigError::Invalid(format!(
                    "origins.allowed entry {origin:?} must look like \"https://shop.example.com\": {e}"
                ))
            })?;
        }

        for pattern in &self.origins.patterns {
            if !pattern.starts_with("*.") || pattern.len() < 3 {
                return Err(ConfigError::Invalid(format!(
                    "origins.patterns entry {pattern:?} must look like \"*.example.com\""
                )));
            }
        }

        let payment = Url::parse(&self.checkout.payment_url)
            .map_err(|e| ConfigError::Invalid(format!("checkout.payment_url: {e}")))?;
        if payment.cannot_be_a_base() {
            return Err(ConfigError::Invalid(format!(
                "checkout.payment_url {:?} is not a page URL",
                self.checkout.payment_url
            )));
        }

        Ok(())
    }

    /// Storage keys in priority order.
    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys::new(self.storage.primary_key.clone(), self.storage.legacy_keys.iter().cloned())
    }

    /// Origin allowlist. The payment page's origin is always trusted.
    pub fn allowlist(&self) -> OriginAllowlist {
        let mut allowlist = OriginAllowlist::new().allow_origins(self.origins.allowed.as_slice());
        for pattern in &self.origins.patterns {
            allowlist = allowlist.allow_pattern(pattern.clone());
        }
        for host in &self.origins.denied_hosts {
            allowlist = allowlist.deny_host(host.clone());
        }
        if self.origins.allow_http {
            allowlist = allowlist.allow_http();
        }
        if let Ok(url) = Url::parse(&self.checkout.payment_url) {
            allowlist = allowlist.allow_origin(url.origin().ascii_serialization());
        }
        allowlist
    }

    /// Handshake retry schedule.
    pub fn handshake_schedule(&self) -> HandshakeSchedule {
        HandshakeSchedule::from_millis(&self.handshake.delays_ms)
    }

    /// Checkout handoff settings.
    pub fn handoff(&self) -> HandoffConfig {
        HandoffConfig::new(self.checkout.payment_url.clone())
            .with_navigation_delay(Duration::from_millis(self.checkout.navigation_delay_ms))
            .with_notify_timeout(Duration::from_millis(self.checkout.notify_timeout_ms))
    }
}

/// Storage key layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Key the canonical envelope is written under first.
    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    /// Keys older scripts read from, in priority order.
    #[serde(default = "default_legacy_keys")]
    pub legacy_keys: Vec<String>,
}

fn default_primary_key() -> String {
    PRIMARY_KEY.to_string()
}

fn default_legacy_keys() -> Vec<String> {
    LEGACY_KEYS.iter().map(|k| k.to_string()).collect()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            primary_key: default_primary_key(),
            legacy_keys: default_legacy_keys(),
        }
    }
}

/// Trusted peer origins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OriginConfig {
    /// Exact origins, e.g. `https://shop.example.com`.
    #[serde(default)]
    pub allowed: Vec<String>,

    /// Subdomain patterns, e.g. `*.example.com`.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Hosts rejected even when a pattern matches.
    #[serde(default)]
    pub denied_hosts: Vec<String>,

    /// Accept plain `http` origins (local development).
    #[serde(default)]
    pub allow_http: bool,
}

/// Ready-signal retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakeConfig {
    /// Delays between ready signals, in milliseconds.
    #[serde(default = "default_handshake_delays")]
    pub delays_ms: Vec<u64>,
}

fn default_handshake_delays() -> Vec<u64> {
    vec![100, 500, 1000, 2000]
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            delays_ms: default_handshake_delays(),
        }
    }
}

/// Payment handoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Payment page the cart is handed to.
    #[serde(default = "default_payment_url")]
    pub payment_url: String,

    /// Wait between the checkout broadcast and navigation.
    #[serde(default = "default_navigation_delay")]
    pub navigation_delay_ms: u64,

    /// Upper bound for the backend checkout notification.
    #[serde(default = "default_notify_timeout")]
    pub notify_timeout_ms: u64,
}

fn default_payment_url() -> String {
    "https://pay.example.com/checkout".to_string()
}

fn default_navigation_delay() -> u64 {
    300
}

fn default_notify_timeout() -> u64 {
    1500
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            payment_url: default_payment_url(),
            navigation_delay_ms: default_navigation_delay(),
            notify_timeout_ms: default_notify_timeout(),
        }
    }
}

/// Generate a default `cart-sync.toml`.
pub fn generate_default_config(shop_origin: &str, payment_url: &str) -> String {
    format!(
        r#"# Cart sync configuration

[storage]
primary_key = "{primary}"
# Keys written by older scripts; kept in sync so they keep working.
legacy_keys = [{legacy}]

[origins]
allowed = ["{shop_origin}"]
# patterns = ["*.{{your-domain}}"]
# denied_hosts = []
allow_http = false

[handshake]
delays_ms = [100, 500, 1000, 2000]

[checkout]
payment_url = "{payment_url}"
navigation_delay_ms = 300
notify_timeout_ms = 1500
"#,
        primary = PRIMARY_KEY,
        legacy = LEGACY_KEYS
            .iter()
            .map(|k| format!("\"{k}\""))
            .collect::<Vec<_>>()
            .join(", "),
    )
}
