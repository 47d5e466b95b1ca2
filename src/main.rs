//! Hub authorization service.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                     HUB                       │
//!   Browser              │  ┌─────────┐   ┌───────────┐   ┌──────────┐  │
//!   ─────────────────────┼─▶│  login  │──▶│   xsrf    │──▶│ sessions │  │
//!                        │  └─────────┘   │  + origin │   └────┬─────┘  │
//!                        │                └───────────┘        │        │
//!   Single-user server   │  ┌──────────────────┐               ▼        │
//!   ─────────────────────┼─▶│ authorizations/  │──────▶ HubAuthService  │
//!                        │  │ cookie           │        ┌──────────┐    │
//!                        │  └──────────────────┘        │  tokens  │    │
//!   Spawner              │  ┌──────────────────┐        └──────────┘    │
//!   ─────────────────────┼─▶│ instances admin  │──────────────┘         │
//!                        │  └──────────────────┘                        │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use hub_auth::config::loader::{finalize, load_config};
use hub_auth::config::watcher::ConfigWatcher;
use hub_auth::config::HubConfig;
use hub_auth::hub::DummyAuthenticator;
use hub_auth::lifecycle::{signals::shutdown_signal, Shutdown};
use hub_auth::observability::{logging, metrics};
use hub_auth::HubServer;

#[derive(Parser)]
#[command(name = "hub-auth")]
#[command(about = "Hub session authorization service", long_about = None)]
struct Args {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Shared password for the built-in authenticator (any password when unset)
    #[arg(long, env = "HUB_DUMMY_PASSWORD")]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => finalize(HubConfig::default())?,
    };

    logging::init(&config.observability.log_level);
    tracing::info!("hub-auth v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        anonymous_ip_cidrs = ?config.xsrf.anonymous_ip_cidrs,
        anonymous_id_headers = ?config.xsrf.anonymous_id_headers,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let (watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(watcher.run()?), rx)
        }
        None => (None, tokio::sync::mpsc::unbounded_channel().1),
    };

    let authenticator = Arc::new(DummyAuthenticator::new(args.password));
    let server = HubServer::new(config, authenticator)?;

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        trigger.trigger();
    });

    server.run(listener, config_updates, server_shutdown).await?;
    drop(watcher);

    tracing::info!("Shutdown complete");
    Ok(())
}
