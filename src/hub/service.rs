//! Authoritative cookie validation.
//!
//! # Responsibilities
//! - Reject calls carrying a retired, revoked or unknown API token
//! - Resolve the cookie to its session, honoring expiry and server scope
//! - Log every decision on the Hub side
//!
//! # Design Decisions
//! - The token check runs first: a stale instance gets `invalid_token`
//!   even for a cookie that would otherwise be valid
//! - Stores are injected, never global

use std::sync::Arc;

use crate::error::RejectReason;
use crate::observability::metrics;
use crate::protocol::{redact, HubUser};
use crate::sessions::SessionStore;
use crate::tokens::ApiTokenStore;

const COMPONENT: &str = "hub_auth_service";

/// Answer to a validation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Accept(HubUser),
    Reject(RejectReason),
}

pub struct HubAuthService {
    tokens: Arc<ApiTokenStore>,
    sessions: Arc<SessionStore>,
}

impl HubAuthService {
    pub fn new(tokens: Arc<ApiTokenStore>, sessions: Arc<SessionStore>) -> Self {
        Self { tokens, sessions }
    }

    pub fn tokens(&self) -> &Arc<ApiTokenStore> {
        &self.tokens
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Validate `cookie` on behalf of the instance holding `api_token`.
    pub fn check_cookie(&self, cookie: &str, api_token: &str) -> AuthDecision {
        let Some(owner) = self.tokens.resolve(api_token) else {
            tracing::warn!(
                component = COMPONENT,
                token_prefix = %redact(api_token),
                cookie_prefix = %redact(cookie),
                "Rejecting cookie check: API token unknown, retired or revoked"
            );
            metrics::record_decision(COMPONENT, "invalid_token");
            return AuthDecision::Reject(RejectReason::InvalidToken);
        };

        let session = match self.sessions.lookup(cookie) {
            Some(session) => session,
            None => {
                tracing::info!(
                    component = COMPONENT,
                    instance_id = %owner.instance_id,
                    cookie_prefix = %redact(cookie),
                    "Rejecting cookie check: no live session"
                );
                metrics::record_decision(COMPONENT, "invalid_cookie");
                return AuthDecision::Reject(RejectReason::InvalidCookie);
            }
        };

        if let Some(server) = &session.server {
            if *server != owner.instance_id {
                tracing::warn!(
                    component = COMPONENT,
                    instance_id = %owner.instance_id,
                    session_server = %server,
                    cookie_prefix = %redact(cookie),
                    "Rejecting cookie check: session scoped to another server"
                );
                metrics::record_decision(COMPONENT, "invalid_cookie");
                return AuthDecision::Reject(RejectReason::InvalidCookie);
            }
        }

        tracing::debug!(
            component = COMPONENT,
            instance_id = %owner.instance_id,
            generation = owner.generation,
            user = %session.user,
            cookie_prefix = %redact(cookie),
            "Accepted cookie"
        );
        metrics::record_decision(COMPONENT, "accept");

        AuthDecision::Accept(HubUser {
            name: session.user,
            session_id: session.session_id,
            server: session.server,
        })
    }
}
