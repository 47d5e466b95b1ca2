//! Login and logout.
//!
//! Credentials are checked by an injected `Authenticator`; this module only
//! enforces XSRF protection and manages the session cookie. Nothing here
//! renders a page: `GET /hub/login` hands out the token for the caller's
//! classified origin and the front end embeds it as `_xsrf`.

use axum::{
    body::Body,
    extract::{FromRequest, State},
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::http::cookies::{cookie_value, session_cookie};
use crate::http::server::AppState;
use crate::protocol::HubUser;
use crate::xsrf::check::{needs_check, peer_ip, query_token, session_binding, submitted_token};

/// Decides whether credentials identify a user.
pub trait Authenticator: Send + Sync {
    /// Normalized user name on success.
    fn authenticate(&self, username: &str, password: &str) -> Option<String>;
}

/// Development authenticator: any non-empty user name, optionally guarded
/// by one shared password. Not for production use.
#[derive(Debug, Clone, Default)]
pub struct DummyAuthenticator {
    password: Option<String>,
}

impl DummyAuthenticator {
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }
}

impl Authenticator for DummyAuthenticator {
    fn authenticate(&self, username: &str, password: &str) -> Option<String> {
        let username = username.trim().to_lowercase();
        if username.is_empty() {
            return None;
        }
        match &self.password {
            Some(expected) if !bool::from(expected.as_bytes().ct_eq(password.as_bytes())) => None,
            _ => Some(username),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginPage {
    pub xsrf_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "_xsrf")]
    pub xsrf: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginSuccess {
    pub name: String,
}

/// `GET /hub/login`
pub async fn login_page(State(state): State<AppState>, req: Request<Body>) -> Json<LoginPage> {
    let binding = state.xsrf.binding(None, peer_ip(&req), req.headers());
    Json(LoginPage {
        xsrf_token: state.xsrf.token_for(&binding),
    })
}

/// `POST /hub/login`
pub async fn login(State(state): State<AppState>, req: Request<Body>) -> Response {
    let peer = peer_ip(&req);
    let headers = req.headers().clone();
    let from_query = query_token(req.uri());

    let Form(form) = match Form::<LoginForm>::from_request(req, &state).await {
        Ok(form) => form,
        Err(rejection) => return rejection.into_response(),
    };

    // Pre-login: bound to the classified origin, never to a session.
    let binding = state.xsrf.binding(None, peer, &headers);
    let submitted = form
        .xsrf
        .as_deref()
        .filter(|t| !t.is_empty())
        .or(from_query.as_deref())
        .or_else(|| submitted_token(&headers));
    if let Err(rejected) = state.xsrf.check(submitted, &binding) {
        return rejected.into_response();
    }

    let Some(name) = state.authenticator.authenticate(&form.username, &form.password) else {
        tracing::info!(username = %form.username, "Failed login");
        return (StatusCode::FORBIDDEN, "Invalid username or password").into_response();
    };

    let (cookie, session) = state.sessions.create(&name, None);
    tracing::info!(user = %name, session_id = %session.session_id, "User logged in");

    let sessions = &state.config.sessions;
    let mut response = Json(LoginSuccess { name }).into_response();
    match HeaderValue::from_str(&session_cookie(
        &sessions.cookie_name,
        &cookie,
        sessions.max_age_secs,
        sessions.secure_cookies,
    )) {
        Ok(value) => {
            response.headers_mut().insert(header::SET_COOKIE, value);
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to build session cookie header");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `POST /hub/logout`
pub async fn logout(State(state): State<AppState>, req: Request<Body>) -> Response {
    let sessions = &state.config.sessions;
    let cookie = cookie_value(req.headers(), &sessions.cookie_name);

    if let Some(cookie) = cookie {
        if let Some(session) = state.sessions.lookup(&cookie) {
            let user = HubUser {
                name: session.user.clone(),
                session_id: session.session_id.clone(),
                server: session.server.clone(),
            };
            if needs_check(req.method(), req.headers(), false) {
                let binding = session_binding(&user);
                let submitted = query_token(req.uri())
                    .or_else(|| submitted_token(req.headers()).map(String::from));
                if let Err(rejected) = state.xsrf.check(submitted.as_deref(), &binding) {
                    return rejected.into_response();
                }
            }
            state.sessions.remove(&cookie);
            tracing::info!(user = %session.user, session_id = %session.session_id, "User logged out");
        }
    }

    let clear = session_cookie(&sessions.cookie_name, "", 0, sessions.secure_cookies);
    let mut response = StatusCode::NO_CONTENT.into_response();
    if let Ok(value) = HeaderValue::from_str(&clear) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}
