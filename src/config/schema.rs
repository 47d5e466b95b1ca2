//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the Hub and
//! for per-user servers that talk to it. All types derive Serde traits for
//! deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HubConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Login session settings.
    pub sessions: SessionConfig,

    /// XSRF token and origin classification settings.
    pub xsrf: XsrfConfig,

    /// Settings for per-user servers validating cookies against the Hub.
    pub client: ClientConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Spawner-facing admin API.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8081").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for the Hub to answer any request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 10 }
    }
}

/// Login session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the session cookie.
    pub cookie_name: String,

    /// Session lifetime in seconds.
    pub max_age_secs: u64,

    /// How often expired sessions are purged, in seconds.
    pub cleanup_interval_secs: u64,

    /// Set the `Secure` attribute on session cookies.
    pub secure_cookies: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "hub-session-id".to_string(),
            max_age_secs: 14 * 24 * 3600,
            cleanup_interval_secs: 60,
            secure_cookies: false,
        }
    }
}

/// XSRF configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct XsrfConfig {
    /// HMAC secret. A random per-process secret is generated when unset,
    /// which only works for a single Hub replica.
    pub secret: Option<String>,

    /// Length of one token window in seconds.
    pub window_secs: u64,

    /// Number of preceding windows still accepted on verification.
    pub tolerance_windows: u32,

    /// CIDR ranges whose addresses are collapsed into one anonymous origin.
    pub anonymous_ip_cidrs: Vec<String>,

    /// Headers identifying an anonymous client, in order.
    pub anonymous_id_headers: Vec<String>,

    /// Headers carrying the real client IP, checked in order.
    /// Empty means the socket peer address is used.
    pub client_ip_headers: Vec<String>,
}

impl Default for XsrfConfig {
    fn default() -> Self {
        Self {
            secret: None,
            window_secs: 3600,
            tolerance_windows: 1,
            anonymous_ip_cidrs: Vec::new(),
            anonymous_id_headers: vec!["User-Agent".to_string()],
            client_ip_headers: vec!["X-Real-Ip".to_string(), "X-Forwarded-For".to_string()],
        }
    }
}

/// Hub authorization client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the Hub API (e.g., "http://127.0.0.1:8081/hub/api").
    pub hub_api_url: String,

    /// API token of this server instance.
    pub api_token: String,

    /// Deadline for one validation round trip in milliseconds.
    pub timeout_ms: u64,

    /// How long an accepted cookie is trusted without asking the Hub again.
    pub cache_ttl_secs: u64,

    /// Upper bound on cached cookies.
    pub cache_max_entries: usize,

    /// Attempts per validation when the Hub is unreachable (1 = no retry).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hub_api_url: "http://127.0.0.1:8081/hub/api".to_string(),
            api_token: String::new(),
            timeout_ms: 5000,
            cache_ttl_secs: 10,
            cache_max_entries: 4096,
            max_attempts: 1,
            base_delay_ms: 50,
            max_delay_ms: 1000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Admin API configuration (used by the spawner).
///
/// Off by default. Enabling it requires a real `api_key`; anyone holding the
/// key can mint and revoke instance tokens.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (`token` or `Bearer` scheme).
    pub api_key: String,
}
