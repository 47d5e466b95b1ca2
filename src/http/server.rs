//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared stores and XSRF guard from validated config
//! - Create the Axum router with all Hub routes
//! - Wire up middleware (tracing, request ID, request deadline)
//! - Apply hot-reloaded XSRF origin settings
//! - Run the session cleanup task
//! - Serve until shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::loader::ConfigError;
use crate::config::schema::HubConfig;
use crate::config::validation::validate_config;
use crate::http::request::UuidRequestId;
use crate::hub::{hub_router, Authenticator, HubAuthService};
use crate::sessions::{run_cleanup, SessionStore};
use crate::tokens::ApiTokenStore;
use crate::xsrf::XsrfGuard;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<HubAuthService>,
    pub tokens: Arc<ApiTokenStore>,
    pub sessions: Arc<SessionStore>,
    pub xsrf: Arc<XsrfGuard>,
    pub authenticator: Arc<dyn Authenticator>,
    pub config: Arc<HubConfig>,
}

impl AppState {
    /// Build every component from a configuration. Fails on invalid CIDR
    /// ranges, header names or other semantic errors.
    pub fn from_config(config: HubConfig, authenticator: Arc<dyn Authenticator>) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let xsrf = XsrfGuard::from_config(&config.xsrf).map_err(|e| ConfigError::Validation(vec![e]))?;
        let tokens = Arc::new(ApiTokenStore::new());
        let sessions = Arc::new(SessionStore::new(config.sessions.max_age_secs));
        let service = Arc::new(HubAuthService::new(tokens.clone(), sessions.clone()));

        Ok(Self {
            service,
            tokens,
            sessions,
            xsrf: Arc::new(xsrf),
            authenticator,
            config: Arc::new(config),
        })
    }
}

/// The Hub's HTTP server.
pub struct HubServer {
    router: Router,
    state: AppState,
}

impl HubServer {
    pub fn new(config: HubConfig, authenticator: Arc<dyn Authenticator>) -> Result<Self, ConfigError> {
        let state = AppState::from_config(config, authenticator)?;
        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let deadline = Duration::from_secs(state.config.timeouts.request_secs);
        hub_router(state)
            .layer(TimeoutLayer::new(deadline))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Router without a listener, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<HubConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Hub server starting");

        tokio::spawn(run_cleanup(
            self.state.sessions.clone(),
            self.state.config.sessions.cleanup_interval_secs,
            shutdown.resubscribe(),
        ));

        let xsrf = self.state.xsrf.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if let Err(e) = xsrf.reload(&config.xsrf) {
                    tracing::error!(error = %e, "Ignoring invalid XSRF configuration update");
                }
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Hub server stopped");
        Ok(())
    }
}
