//! Per-request authentication for single-user servers.
//!
//! `require_hub_user` resolves the Hub session cookie to a `HubUser` and
//! stores it in request extensions for downstream handlers. Cookie
//! authentication never sets `xsrf::TokenAuthenticated`, so an
//! `Authorization` header alone does not exempt a request from XSRF checks.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::client::hub_client::HubAuthClient;
use crate::error::{HubAuthError, RejectReason};
use crate::http::cookies::cookie_value;

#[derive(Clone)]
pub struct HubUserState {
    pub client: Arc<HubAuthClient>,
    pub cookie_name: String,
}

pub async fn require_hub_user(
    State(state): State<HubUserState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(cookie) = cookie_value(request.headers(), &state.cookie_name) else {
        return (StatusCode::UNAUTHORIZED, "Please log in.").into_response();
    };

    match state.client.validate(&cookie).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(HubAuthError::Rejected(reason)) => {
            if reason == RejectReason::InvalidToken {
                tracing::error!(
                    component = "hub_auth_client",
                    "Hub rejected this server's API token; the instance may have been replaced"
                );
            }
            (StatusCode::FORBIDDEN, "Your session is no longer valid, please log in again.")
                .into_response()
        }
        Err(HubAuthError::HubUnreachable(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, "Authentication service unavailable.").into_response()
        }
    }
}
