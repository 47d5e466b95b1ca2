//! Wire types for the Hub validation endpoint.
//!
//! Shared by the Hub handlers and the per-user server client so both sides
//! agree on field names.

use serde::{Deserialize, Serialize};

use crate::error::RejectReason;

/// Path of the cookie validation endpoint, relative to the Hub API root.
pub const COOKIE_CHECK_PATH: &str = "authorizations/cookie";

/// Identity returned by the Hub for an accepted cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubUser {
    /// User name.
    pub name: String,
    /// Non-secret identifier of the login session.
    pub session_id: String,
    /// Server instance the session is scoped to, if any.
    #[serde(default)]
    pub server: Option<String>,
}

/// Body of a cookie validation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieCheckRequest {
    pub cookie: String,
}

/// Body of a 403 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectBody {
    pub reason: RejectReason,
}

/// Extract an API token from an `Authorization` header value.
///
/// Accepts both `token <value>` and `Bearer <value>`.
pub fn parse_authorization(value: &str) -> Option<&str> {
    let (scheme, rest) = value.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        let token = rest.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }
    None
}

/// First few characters of a secret, for log lines.
pub fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(6).collect();
    format!("{}...", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_authorization() {
        assert_eq!(parse_authorization("token abc"), Some("abc"));
        assert_eq!(parse_authorization("Bearer  abc "), Some("abc"));
        assert_eq!(parse_authorization("Basic abc"), None);
        assert_eq!(parse_authorization("token "), None);
        assert_eq!(parse_authorization("abc"), None);
    }

    #[test]
    fn test_redact_never_leaks_full_value() {
        assert_eq!(redact("abcdefghijkl"), "abcdef...");
        assert_eq!(redact("ab"), "ab...");
    }
}
