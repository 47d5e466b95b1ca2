//! Hub session authentication and XSRF protection.
//!
//! The Hub owns user sessions and per-instance API tokens. Single-user
//! servers validate browser cookies against the Hub, and both sides share
//! the XSRF token scheme, including anonymous tokens bound to a request's
//! origin when no user is logged in.

pub mod clock;
pub mod error;
pub mod protocol;

// Core subsystems
pub mod client;
pub mod config;
pub mod http;
pub mod hub;
pub mod origin;
pub mod sessions;
pub mod tokens;
pub mod xsrf;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use client::HubAuthClient;
pub use config::schema::HubConfig;
pub use error::{HubAuthError, RejectReason};
pub use http::HubServer;
pub use lifecycle::Shutdown;
pub use protocol::HubUser;
