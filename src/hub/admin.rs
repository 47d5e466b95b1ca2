//! Spawner-facing admin API.
//!
//! The spawner calls `issue` when a per-user server starts and `revoke`
//! when it stops or is replaced. The Hub never initiates spawns itself.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::http::server::AppState;
use crate::protocol::parse_authorization;
use crate::tokens::{InstanceSummary, IssuedToken};

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(parse_authorization);

    let expected = state.config.admin.api_key.as_bytes();
    match presented {
        Some(key) if bool::from(key.as_bytes().ct_eq(expected)) => Ok(next.run(request).await),
        _ => {
            tracing::warn!(path = %request.uri().path(), "Admin API call with missing or wrong key");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// `POST /hub/api/instances/{instance_id}/token`
pub async fn issue_token(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
) -> (StatusCode, Json<IssuedToken>) {
    (StatusCode::CREATED, Json(state.tokens.issue(&instance_id)))
}

/// `DELETE /hub/api/instances/{instance_id}/token`
pub async fn revoke_token(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
) -> StatusCode {
    state.tokens.revoke_all(&instance_id);
    StatusCode::NO_CONTENT
}

/// `GET /hub/api/instances`
pub async fn list_instances(State(state): State<AppState>) -> Json<Vec<InstanceSummary>> {
    Json(state.tokens.instances())
}

#[derive(Serialize)]
pub struct SessionsRemoved {
    pub removed: usize,
}

/// `DELETE /hub/api/users/{name}/sessions`
pub async fn remove_user_sessions(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let removed = state.sessions.remove_user(&name);
    tracing::info!(user = %name, removed, "Removed user sessions");
    Json(SessionsRemoved { removed })
}
