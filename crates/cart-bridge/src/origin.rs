//! Origin allowlist for cross-context messages.
//!
//! Messages are only accepted from, and only posted to, origins on the
//! list. There is no wildcard `*` target: an empty allowlist trusts nobody.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// Origin allowlist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OriginAllowlist {
    /// Allowed exact origins, normalized (`https://shop.example.com`).
    allowed_origins: Vec<String>,
    /// Allowed host patterns (supports a leading `*.` wildcard).
    allowed_patterns: Vec<String>,
    /// Explicitly denied hosts (takes precedence).
    denied_hosts: Vec<String>,
    /// Schemes accepted for pattern matches.
    allowed_schemes: Vec<String>,
}

impl OriginAllowlist {
    /// Create an empty allowlist (deny everything).
    pub fn new() -> Self {
        Self {
            allowed_schemes: vec!["https".to_string()],
            ..Default::default()
        }
    }

    /// Allow one exact origin.
    pub fn allow_origin(mut self, origin: impl AsRef<str>) -> Self {
        match ParsedOrigin::parse(origin.as_ref()) {
            Ok(parsed) => self.allowed_origins.push(parsed.serialize()),
            Err(e) => tracing::warn!(error = %e, "ignoring invalid allowlist origin"),
        }
        self
    }

    /// Allow several exact origins.
    pub fn allow_origins<S: AsRef<str>>(self, origins: &[S]) -> Self {
        origins.iter().fold(self, |list, o| list.allow_origin(o))
    }

    /// Allow a host pattern such as `*.example.com`.
    pub fn allow_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.allowed_patterns.push(pattern.into().to_lowercase());
        self
    }

    /// Deny a host regardless of other rules.
    pub fn deny_host(mut self, host: impl Into<String>) -> Self {
        self.denied_hosts.push(host.into().to_lowercase());
        self
    }

    /// Accept `http` origins for pattern matches (local development).
    pub fn allow_http(mut self) -> Self {
        if !self.allowed_schemes.iter().any(|s| s == "http") {
            self.allowed_schemes.push("http".to_string());
        }
        self
    }

    /// Check an origin such as `event.origin`.
    pub fn check_origin(&self, origin: &str) -> BridgeResult<()> {
        let parsed = ParsedOrigin::parse(origin)?;

        if self.denied_hosts.contains(&parsed.host) {
            return Err(BridgeError::OriginNotAllowed(origin.to_string()));
        }

        if self.allowed_origins.contains(&parsed.serialize()) {
            return Ok(());
        }

        if self.allowed_schemes.contains(&parsed.scheme)
            && self
                .allowed_patterns
                .iter()
                .any(|p| matches_pattern(&parsed.host, p))
        {
            return Ok(());
        }

        Err(BridgeError::OriginNotAllowed(origin.to_string()))
    }

    /// Whether an origin passes [`check_origin`](Self::check_origin).
    pub fn is_allowed(&self, origin: &str) -> bool {
        self.check_origin(origin).is_ok()
    }

    /// Whether no rule allows anything.
    pub fn is_empty(&self) -> bool {
        self.allowed_origins.is_empty() && self.allowed_patterns.is_empty()
    }
}

/// Parse and normalize an origin (`scheme://host[:port]`).
///
/// Only `http` and `https` origins with a host are accepted.
pub fn parse_origin(origin: &str) -> BridgeResult<String> {
    ParsedOrigin::parse(origin).map(|parsed| parsed.serialize())
}

/// `scheme://host[:port]`, lowercased, default port dropped.
#[derive(Debug, PartialEq)]
struct ParsedOrigin {
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl ParsedOrigin {
    fn parse(origin: &str) -> BridgeResult<Self> {
        let invalid = || BridgeError::InvalidOrigin(origin.to_string());

        let (scheme, rest) = origin.trim().split_once("://").ok_or_else(invalid)?;
        let scheme = scheme.to_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(invalid());
        }

        let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
        if authority.is_empty() || authority.contains('@') {
            return Err(invalid());
        }

        let (host, port) = if authority.starts_with('[') {
            // IPv6 literal: [::1] or [::1]:8080
            let end = authority.find(']').ok_or_else(invalid)?;
            let (host, rest) = authority.split_at(end + 1);
            match rest.strip_prefix(':') {
                Some(p) => (host, Some(p.parse::<u16>().map_err(|_| invalid())?)),
                None if rest.is_empty() => (host, None),
                None => return Err(invalid()),
            }
        } else {
            match authority.rsplit_once(':') {
                Some((h, p)) => (h, Some(p.parse::<u16>().map_err(|_| invalid())?)),
                None => (authority, None),
            }
        };

        if host.is_empty() {
            return Err(invalid());
        }

        let port = port.filter(|p| *p != default_port(&scheme));

        Ok(Self {
            scheme,
            host: host.to_lowercase(),
            port,
        })
    }

    fn serialize(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.scheme, self.host, port),
            None => format!("{}://{}", self.scheme, self.host),
        }
    }
}

fn default_port(scheme: &str) -> u16 {
    match scheme {
        "http" => 80,
        _ => 443,
    }
}

fn matches_pattern(host: &str, pattern: &str) -> bool {
    match pattern.strip_prefix("*.") {
        // "*.example.com" matches subdomains only, never "example.com" or "badexample.com"
        Some(suffix) => host
            .strip_suffix(suffix)
            .map(|prefix| prefix.ends_with('.') && prefix.len() > 1)
            .unwrap_or(false),
        None => host == pattern,
    }
}
