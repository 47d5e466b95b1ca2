//! Request-level XSRF policy.
//!
//! # Responsibilities
//! - Decide which requests need a token (fetch metadata + method)
//! - Pick the binding: login session if authenticated, else classified origin
//! - Verify submitted tokens and reject with a generic message
//!
//! # Design Decisions
//! - Token-authenticated API calls and plain navigations are exempt; only a
//!   `TokenAuthenticated` marker set by the authenticating layer counts, never
//!   the mere presence of an `Authorization` header
//! - The token is read from the `_xsrf` query argument, then the `_xsrf` field
//!   of a urlencoded form body, then the token headers
//! - Origin configuration can be swapped at runtime (arc-swap); the secret
//!   cannot

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, Method, Request, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::config::schema::XsrfConfig;
use crate::config::validation::ValidationError;
use crate::observability::metrics;
use crate::origin::OriginResolver;
use crate::protocol::HubUser;
use crate::xsrf::engine::{XsrfBinding, XsrfEngine};

/// Form field carrying the token.
pub const XSRF_FIELD: &str = "_xsrf";

const TOKEN_HEADERS: [&str; 2] = ["x-xsrftoken", "x-csrftoken"];

/// Largest form body buffered while looking for `_xsrf`.
pub const MAX_FORM_BYTES: usize = 1024 * 1024;

/// Message shown to users on any XSRF failure.
pub const XSRF_REJECTED_MESSAGE: &str =
    "Request blocked by forgery protection. Reload the page and try again.";

/// Token extension attached to every request passing `xsrf_middleware`, for
/// handlers that embed it in forms.
#[derive(Debug, Clone)]
pub struct XsrfToken(pub String);

/// Request extension set by an authentication layer that accepted an API
/// token. Such requests carry no ambient browser credentials and skip the
/// XSRF check. Cookie-authenticated requests never get it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAuthenticated;

/// Generic XSRF failure; detail goes to the logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("XSRF token missing or invalid")]
pub struct XsrfRejected;

impl IntoResponse for XsrfRejected {
    fn into_response(self) -> Response {
        (StatusCode::FORBIDDEN, XSRF_REJECTED_MESSAGE).into_response()
    }
}

/// Does this request need an XSRF check?
pub fn needs_check(method: &Method, headers: &HeaderMap, token_authenticated: bool) -> bool {
    if token_authenticated {
        return false;
    }

    let fetch_mode = headers
        .get("sec-fetch-mode")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unspecified");

    let safe_method = matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS);
    match fetch_mode {
        "websocket" | "no-cors" => false,
        "navigate" if safe_method => false,
        "unspecified" if safe_method => {
            tracing::warn!(method = %method, "Skipping XSRF check for request without Sec-Fetch-Mode");
            false
        }
        _ => true,
    }
}

/// Token submitted in a header, if any.
pub fn submitted_token(headers: &HeaderMap) -> Option<&str> {
    TOKEN_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|v| v.to_str().ok())
        .find(|v| !v.is_empty())
}

/// `_xsrf` from the query string, if present and non-empty.
pub fn query_token(uri: &Uri) -> Option<String> {
    uri.query().and_then(|q| form_token(q.as_bytes()))
}

/// `_xsrf` from a urlencoded form body, if present and non-empty.
pub fn form_token(body: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(name, _)| name == XSRF_FIELD)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

fn is_urlencoded_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
}

/// Binding for an authenticated user.
pub fn session_binding(user: &HubUser) -> XsrfBinding {
    XsrfBinding::Session(format!("{}:{}", user.name, user.session_id))
}

/// Engine plus the swappable origin classification.
#[derive(Debug)]
pub struct XsrfGuard {
    engine: XsrfEngine,
    origin: ArcSwap<OriginResolver>,
}

impl XsrfGuard {
    pub fn new(engine: XsrfEngine, origin: OriginResolver) -> Self {
        Self {
            engine,
            origin: ArcSwap::from_pointee(origin),
        }
    }

    pub fn from_config(config: &XsrfConfig) -> Result<Self, ValidationError> {
        let origin = OriginResolver::from_config(config)?;
        let engine = match &config.secret {
            Some(secret) if !secret.is_empty() => {
                XsrfEngine::new(secret.as_bytes().to_vec(), config.window_secs, config.tolerance_windows)
            }
            _ => {
                tracing::warn!("No xsrf.secret configured, using a random per-process secret");
                XsrfEngine::with_random_secret(config.window_secs, config.tolerance_windows)
            }
        };
        Ok(Self::new(engine, origin))
    }

    /// Swap in new origin settings. The old settings stay on error.
    pub fn reload(&self, config: &XsrfConfig) -> Result<(), ValidationError> {
        let origin = OriginResolver::from_config(config)?;
        self.origin.store(Arc::new(origin));
        tracing::info!(
            anonymous_ip_cidrs = ?config.anonymous_ip_cidrs,
            anonymous_id_headers = ?config.anonymous_id_headers,
            "XSRF origin configuration reloaded"
        );
        Ok(())
    }

    pub fn engine(&self) -> &XsrfEngine {
        &self.engine
    }

    /// Binding for a request.
    pub fn binding(&self, user: Option<&HubUser>, peer: Option<IpAddr>, headers: &HeaderMap) -> XsrfBinding {
        match user {
            Some(user) => session_binding(user),
            None => XsrfBinding::Anonymous(self.origin.load().origin_key(peer, headers)),
        }
    }

    pub fn token_for(&self, binding: &XsrfBinding) -> String {
        self.engine.mint_now(binding)
    }

    /// Verify a submitted token against a binding.
    pub fn check(&self, submitted: Option<&str>, binding: &XsrfBinding) -> Result<(), XsrfRejected> {
        let Some(token) = submitted.filter(|t| !t.is_empty()) else {
            tracing::warn!(binding = %describe(binding), "XSRF token missing");
            metrics::record_xsrf_check("missing");
            return Err(XsrfRejected);
        };

        if self.engine.verify_now(token, binding) {
            metrics::record_xsrf_check("accepted");
            Ok(())
        } else {
            tracing::warn!(binding = %describe(binding), "XSRF token mismatch");
            metrics::record_xsrf_check("rejected");
            Err(XsrfRejected)
        }
    }
}

fn describe(binding: &XsrfBinding) -> String {
    match binding {
        XsrfBinding::Session(id) => format!("session:{}", id.split(':').next().unwrap_or_default()),
        XsrfBinding::Anonymous(origin) => format!("origin:{}", origin.fingerprint()),
    }
}

/// Socket peer recorded by `into_make_service_with_connect_info`, if any.
pub fn peer_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Middleware enforcing XSRF tokens on state-changing browser requests.
///
/// Place it inside `require_hub_user` so authenticated requests are bound to
/// their session.
pub async fn xsrf_middleware(
    State(guard): State<Arc<XsrfGuard>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let user = req.extensions().get::<HubUser>().cloned();
    let binding = guard.binding(user.as_ref(), peer_ip(&req), req.headers());
    let token_authenticated = req.extensions().get::<TokenAuthenticated>().is_some();

    if needs_check(req.method(), req.headers(), token_authenticated) {
        let mut submitted = query_token(req.uri());

        if submitted.is_none() && is_urlencoded_form(req.headers()) {
            let (parts, body) = req.into_parts();
            let bytes = match to_bytes(body, MAX_FORM_BYTES).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable form body during XSRF check");
                    return (StatusCode::PAYLOAD_TOO_LARGE, "Form body too large").into_response();
                }
            };
            submitted = form_token(&bytes);
            req = Request::from_parts(parts, Body::from(bytes));
        }

        let submitted = submitted.or_else(|| submitted_token(req.headers()).map(String::from));
        if let Err(rejected) = guard.check(submitted.as_deref(), &binding) {
            return rejected.into_response();
        }
    }

    req.extensions_mut().insert(XsrfToken(guard.token_for(&binding)));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(mode: Option<&'static str>) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(mode) = mode {
            h.insert("sec-fetch-mode", HeaderValue::from_static(mode));
        }
        h
    }

    #[test]
    fn test_needs_check_matrix() {
        assert!(!needs_check(&Method::GET, &headers(Some("navigate")), false));
        assert!(!needs_check(&Method::GET, &headers(None), false));
        assert!(!needs_check(&Method::POST, &headers(Some("websocket")), false));
        assert!(!needs_check(&Method::POST, &headers(Some("no-cors")), false));
        assert!(!needs_check(&Method::POST, &headers(Some("cors")), true));

        assert!(needs_check(&Method::POST, &headers(Some("navigate")), false));
        assert!(needs_check(&Method::POST, &headers(None), false));
        assert!(needs_check(&Method::GET, &headers(Some("cors")), false));
        assert!(needs_check(&Method::DELETE, &headers(Some("same-origin")), false));
    }

    #[test]
    fn test_form_and_query_tokens() {
        assert_eq!(form_token(b"name=x&_xsrf=abc-_1&other=2"), Some("abc-_1".to_string()));
        assert_eq!(form_token(b"_xsrf=&name=x"), None);
        assert_eq!(form_token(b"xsrf=abc"), None);

        let uri: Uri = "/settings?a=1&_xsrf=tok".parse().unwrap();
        assert_eq!(query_token(&uri), Some("tok".to_string()));
        let uri: Uri = "/settings".parse().unwrap();
        assert_eq!(query_token(&uri), None);
    }

    #[test]
    fn test_urlencoded_detection() {
        let mut h = HeaderMap::new();
        assert!(!is_urlencoded_form(&h));
        h.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("Application/X-WWW-Form-Urlencoded; charset=UTF-8"),
        );
        assert!(is_urlencoded_form(&h));
        h.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(!is_urlencoded_form(&h));
    }

    #[test]
    fn test_submitted_token_headers() {
        let mut h = HeaderMap::new();
        assert_eq!(submitted_token(&h), None);
        h.insert("x-csrftoken", HeaderValue::from_static("b"));
        assert_eq!(submitted_token(&h), Some("b"));
        h.insert("x-xsrftoken", HeaderValue::from_static("a"));
        assert_eq!(submitted_token(&h), Some("a"));
    }

    #[test]
    fn test_guard_round_trip_and_reload() {
        let config = XsrfConfig {
            secret: Some("s3cret".into()),
            anonymous_ip_cidrs: vec![],
            client_ip_headers: vec![],
            ..XsrfConfig::default()
        };
        let guard = XsrfGuard::from_config(&config).unwrap();
        let h = HeaderMap::new();

        let a = guard.binding(None, Some("10.1.2.3".parse().unwrap()), &h);
        let b = guard.binding(None, Some("10.9.9.9".parse().unwrap()), &h);
        let token = guard.token_for(&a);
        assert!(guard.check(Some(&token), &a).is_ok());
        assert_eq!(guard.check(Some(&token), &b), Err(XsrfRejected));
        assert_eq!(guard.check(None, &a), Err(XsrfRejected));

        let reloaded = XsrfConfig {
            anonymous_ip_cidrs: vec!["10.0.0.0/8".into()],
            ..config.clone()
        };
        guard.reload(&reloaded).unwrap();
        let a = guard.binding(None, Some("10.1.2.3".parse().unwrap()), &h);
        let b = guard.binding(None, Some("10.9.9.9".parse().unwrap()), &h);
        assert!(guard.check(Some(&guard.token_for(&a)), &b).is_ok());

        let broken = XsrfConfig {
            anonymous_ip_cidrs: vec!["10.0.0.0/99".into()],
            ..config
        };
        assert!(guard.reload(&broken).is_err());
        let b = guard.binding(None, Some("10.9.9.9".parse().unwrap()), &h);
        assert!(guard.check(Some(&guard.token_for(&a)), &b).is_ok());
    }
}
