//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use hub_auth::config::{ClientConfig, HubConfig};
use hub_auth::http::AppState;
use hub_auth::hub::DummyAuthenticator;
use hub_auth::{HubServer, Shutdown};

pub const ADMIN_KEY: &str = "test-admin-key";

/// A Hub running on a loopback port.
pub struct TestHub {
    pub addr: SocketAddr,
    pub state: AppState,
    shutdown: Shutdown,
}

impl TestHub {
    pub fn api_url(&self) -> String {
        format!("http://{}/hub/api", self.addr)
    }

    pub fn stop(&self) {
        self.shutdown.trigger();
    }
}

impl Drop for TestHub {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Deterministic configuration for tests.
pub fn test_config() -> HubConfig {
    let mut config = HubConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.xsrf.secret = Some("integration-test-secret".into());
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.into();
    config
}

pub async fn start_hub(config: HubConfig) -> TestHub {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    start_hub_on(listener, config).await
}

pub async fn start_hub_on(listener: TcpListener, config: HubConfig) -> TestHub {
    let addr = listener.local_addr().unwrap();
    let server = HubServer::new(config, Arc::new(DummyAuthenticator::default())).unwrap();
    let state = server.state().clone();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    // Keep the sender alive so the reload task idles instead of exiting.
    let (updates_tx, updates_rx) = tokio::sync::mpsc::unbounded_channel::<HubConfig>();
    tokio::spawn(async move {
        let _updates_tx = updates_tx;
        let _ = server.run(listener, updates_rx, rx).await;
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    TestHub { addr, state, shutdown }
}

/// Serve an arbitrary router, e.g. a scripted fake Hub.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

pub fn client_config(api_url: &str, api_token: &str) -> ClientConfig {
    ClientConfig {
        hub_api_url: api_url.to_string(),
        api_token: api_token.to_string(),
        timeout_ms: 1000,
        ..ClientConfig::default()
    }
}
