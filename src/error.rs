//! Error taxonomy for cookie validation.
//!
//! # Design Decisions
//! - `HubUnreachable` is infrastructure trouble and may be retried
//! - `Rejected` is an authoritative answer from the Hub and must not be
//!   retried with the same API token
//! - Configuration errors live in `config::loader` and never occur at
//!   request time

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the Hub refused a validation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The API token is unknown, retired by a respawn, or revoked.
    InvalidToken,
    /// The session cookie is unknown, expired, or scoped to another server.
    InvalidCookie,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::InvalidToken => "invalid_token",
            RejectReason::InvalidCookie => "invalid_cookie",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure modes of `HubAuthClient::validate`.
///
/// `Clone` so a single coalesced Hub round trip can be shared by every
/// waiter on the same cookie.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubAuthError {
    #[error("hub unreachable: {0}")]
    HubUnreachable(String),

    #[error("rejected by hub: {0}")]
    Rejected(RejectReason),
}

impl HubAuthError {
    /// Transport failures may succeed on a later attempt; rejections never do.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HubAuthError::HubUnreachable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classes() {
        assert!(HubAuthError::HubUnreachable("timeout".into()).is_retryable());
        assert!(!HubAuthError::Rejected(RejectReason::InvalidToken).is_retryable());
        assert!(!HubAuthError::Rejected(RejectReason::InvalidCookie).is_retryable());
    }

    #[test]
    fn test_reason_wire_names() {
        let json = serde_json::to_string(&RejectReason::InvalidCookie).unwrap();
        assert_eq!(json, "\"invalid_cookie\"");
        let parsed: RejectReason = serde_json::from_str("\"invalid_token\"").unwrap();
        assert_eq!(parsed, RejectReason::InvalidToken);
    }
}
