//! Hub API handlers for the validation endpoint and status.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::RejectReason;
use crate::http::server::AppState;
use crate::hub::service::AuthDecision;
use crate::protocol::{parse_authorization, CookieCheckRequest, RejectBody};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub sessions: usize,
    pub instances: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        sessions: state.sessions.len(),
        instances: state.tokens.instances().iter().filter(|i| i.active).count(),
    })
}

/// `POST /hub/api/authorizations/cookie`
///
/// Every outcome is `200 HubUser` or `403 {reason}`. The API token is judged
/// before the body, and an unreadable body counts as an unknown cookie, so a
/// malformed request never looks like an outage to the client.
pub async fn check_cookie(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CookieCheckRequest>, JsonRejection>,
) -> Response {
    let api_token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_authorization)
        .unwrap_or_default();

    let cookie = match body {
        Ok(Json(body)) => body.cookie,
        Err(rejection) => {
            tracing::warn!(
                component = "hub_auth_service",
                error = %rejection.body_text(),
                "Unreadable cookie check body"
            );
            String::new()
        }
    };

    match state.service.check_cookie(&cookie, api_token) {
        AuthDecision::Accept(user) => (StatusCode::OK, Json(user)).into_response(),
        AuthDecision::Reject(reason) => reject(reason),
    }
}

fn reject(reason: RejectReason) -> Response {
    (StatusCode::FORBIDDEN, Json(RejectBody { reason })).into_response()
}
