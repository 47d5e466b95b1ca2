//! Hub subsystem.
//!
//! # Data Flow
//! ```text
//! Per-user server:  POST /hub/api/authorizations/cookie
//!     → handlers.rs (extract API token + cookie)
//!     → service.rs (token current? session live and in scope?)
//!     → 200 HubUser | 403 {reason}
//!
//! Spawner:          POST/DELETE /hub/api/instances/{id}/token
//!     → admin.rs (admin key) → tokens::ApiTokenStore
//!
//! Browser:          GET/POST /hub/login, POST /hub/logout
//!     → login.rs (XSRF check → Authenticator → sessions)
//! ```

pub mod admin;
pub mod handlers;
pub mod login;
pub mod service;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::http::server::AppState;

pub use login::{Authenticator, DummyAuthenticator};
pub use service::{AuthDecision, HubAuthService};

/// All Hub routes.
pub fn hub_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/hub/api/authorizations/cookie", post(handlers::check_cookie))
        .route("/hub/api/status", get(handlers::get_status))
        .route("/hub/login", get(login::login_page).post(login::login))
        .route("/hub/logout", post(login::logout));

    if state.config.admin.enabled {
        let admin = Router::new()
            .route(
                "/hub/api/instances/{instance_id}/token",
                post(admin::issue_token).delete(admin::revoke_token),
            )
            .route("/hub/api/instances", get(admin::list_instances))
            .route("/hub/api/users/{name}/sessions", delete(admin::remove_user_sessions))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                admin::admin_auth_middleware,
            ));
        router = router.merge(admin);
    }

    router.with_state(state)
}
