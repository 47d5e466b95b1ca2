//! Hub authorization client.
//!
//! # Responsibilities
//! - Ask the Hub whether a browser cookie authenticates a user
//! - Present this instance's API token on every request
//! - Cache accepted cookies briefly and coalesce concurrent lookups
//!
//! # Design Decisions
//! - Every round trip has a deadline; expiry is `HubUnreachable`
//! - Only transport failures are retried (bounded, with backoff)
//! - After an `invalid_token` rejection the same token is never sent again;
//!   `set_api_token` installs a replacement
//! - A cancelled caller does not cancel the shared lookup for other waiters

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use reqwest::{header::AUTHORIZATION, StatusCode};
use thiserror::Error;
use tokio::sync::OnceCell;
use tokio::time;
use url::Url;

use crate::client::cache::IdentityCache;
use crate::config::schema::ClientConfig;
use crate::error::{HubAuthError, RejectReason};
use crate::observability::metrics;
use crate::protocol::{redact, CookieCheckRequest, HubUser, RejectBody, COOKIE_CHECK_PATH};
use crate::resilience::calculate_backoff;

const COMPONENT: &str = "hub_auth_client";

type Outcome = Result<HubUser, HubAuthError>;

#[derive(Debug, Error)]
pub enum ClientInitError {
    #[error("invalid hub API URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

pub struct HubAuthClient {
    http: reqwest::Client,
    endpoint: Url,
    api_token: ArcSwap<String>,
    token_rejected: AtomicBool,
    cache: IdentityCache,
    inflight: DashMap<String, Arc<OnceCell<Outcome>>>,
    timeout: Duration,
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl HubAuthClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientInitError> {
        let mut base = Url::parse(&config.hub_api_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(COOKIE_CHECK_PATH)?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .no_proxy()
            .build()?;

        Ok(Self {
            http,
            endpoint,
            api_token: ArcSwap::from_pointee(config.api_token.clone()),
            token_rejected: AtomicBool::new(false),
            cache: IdentityCache::new(
                Duration::from_secs(config.cache_ttl_secs),
                config.cache_max_entries,
            ),
            inflight: DashMap::new(),
            timeout,
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    /// Install a new API token, e.g. after a respawn.
    pub fn set_api_token(&self, token: impl Into<String>) {
        self.api_token.store(Arc::new(token.into()));
        self.token_rejected.store(false, Ordering::SeqCst);
        tracing::info!(component = COMPONENT, "API token replaced");
    }

    /// Whether the Hub has rejected the current API token.
    pub fn token_rejected(&self) -> bool {
        self.token_rejected.load(Ordering::SeqCst)
    }

    /// Resolve `cookie` to a user via the Hub.
    pub async fn validate(&self, cookie: &str) -> Outcome {
        if cookie.is_empty() {
            return Err(HubAuthError::Rejected(RejectReason::InvalidCookie));
        }

        if let Some(user) = self.cache.get(cookie) {
            metrics::record_cache("hit");
            return Ok(user);
        }
        metrics::record_cache("miss");

        if self.token_rejected() {
            tracing::debug!(
                component = COMPONENT,
                cookie_prefix = %redact(cookie),
                "Not contacting Hub: current API token was rejected"
            );
            return Err(HubAuthError::Rejected(RejectReason::InvalidToken));
        }

        let cell = self
            .inflight
            .entry(cookie.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        let outcome = cell.get_or_init(|| self.fetch_with_retry(cookie)).await.clone();
        self.inflight.remove_if(cookie, |_, c| Arc::ptr_eq(c, &cell));
        outcome
    }

    async fn fetch_with_retry(&self, cookie: &str) -> Outcome {
        let token = self.api_token.load_full();
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.fetch_once(cookie, &token).await {
                Ok(user) => {
                    tracing::info!(
                        component = COMPONENT,
                        cookie_prefix = %redact(cookie),
                        user = %user.name,
                        "Hub accepted cookie"
                    );
                    metrics::record_decision(COMPONENT, "accept");
                    self.cache.insert(cookie, user.clone());
                    return Ok(user);
                }
                Err(HubAuthError::Rejected(reason)) => {
                    tracing::warn!(
                        component = COMPONENT,
                        cookie_prefix = %redact(cookie),
                        reason = %reason,
                        "Hub rejected cookie"
                    );
                    metrics::record_decision(COMPONENT, reason.as_str());
                    if reason == RejectReason::InvalidToken && **self.api_token.load() == *token {
                        self.token_rejected.store(true, Ordering::SeqCst);
                    }
                    return Err(HubAuthError::Rejected(reason));
                }
                Err(HubAuthError::HubUnreachable(detail)) => {
                    if attempts < self.max_attempts {
                        let delay = calculate_backoff(attempts, self.base_delay_ms, self.max_delay_ms);
                        tracing::info!(
                            component = COMPONENT,
                            attempt = attempts,
                            delay = ?delay,
                            error = %detail,
                            "Retrying Hub validation"
                        );
                        time::sleep(delay).await;
                        continue;
                    }
                    tracing::error!(
                        component = COMPONENT,
                        endpoint = %self.endpoint,
                        cookie_prefix = %redact(cookie),
                        attempts,
                        error = %detail,
                        "Hub unreachable, no validation response received"
                    );
                    metrics::record_decision(COMPONENT, "unreachable");
                    return Err(HubAuthError::HubUnreachable(detail));
                }
            }
        }
    }

    async fn fetch_once(&self, cookie: &str, token: &str) -> Outcome {
        let request = self
            .http
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, format!("token {}", token))
            .json(&CookieCheckRequest {
                cookie: cookie.to_string(),
            });

        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|e| HubAuthError::HubUnreachable(e.to_string()))?;

            match response.status() {
                StatusCode::OK => response.json::<HubUser>().await.map_err(|e| {
                    HubAuthError::HubUnreachable(format!("malformed Hub response: {}", e))
                }),
                StatusCode::FORBIDDEN => {
                    let reason = response
                        .json::<RejectBody>()
                        .await
                        .map(|body| body.reason)
                        .unwrap_or(RejectReason::InvalidToken);
                    Err(HubAuthError::Rejected(reason))
                }
                other => Err(HubAuthError::HubUnreachable(format!(
                    "unexpected Hub status {}",
                    other
                ))),
            }
        };

        match time::timeout(self.timeout, exchange).await {
            Ok(outcome) => outcome,
            Err(_) => Err(HubAuthError::HubUnreachable(format!(
                "no response within {:?}",
                self.timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> ClientConfig {
        ClientConfig {
            hub_api_url: url.to_string(),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn test_endpoint_join() {
        let a = HubAuthClient::new(&config("http://hub:8081/hub/api")).unwrap();
        let b = HubAuthClient::new(&config("http://hub:8081/hub/api/")).unwrap();
        assert_eq!(a.endpoint().as_str(), "http://hub:8081/hub/api/authorizations/cookie");
        assert_eq!(a.endpoint(), b.endpoint());
    }

    #[test]
    fn test_bad_url() {
        assert!(matches!(
            HubAuthClient::new(&config("not a url")),
            Err(ClientInitError::Url(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_cookie_never_contacts_hub() {
        let client = HubAuthClient::new(&config("http://127.0.0.1:1/hub/api")).unwrap();
        assert_eq!(
            client.validate("").await,
            Err(HubAuthError::Rejected(RejectReason::InvalidCookie))
        );
    }

    #[tokio::test]
    async fn test_unreachable_hub_is_retryable() {
        // Port 1 is reserved; nothing listens there.
        let mut cfg = config("http://127.0.0.1:1/hub/api");
        cfg.timeout_ms = 500;
        let client = HubAuthClient::new(&cfg).unwrap();
        let err = client.validate("cookie").await.unwrap_err();
        assert!(err.is_retryable(), "{:?}", err);
        assert!(!client.token_rejected());
    }
}
