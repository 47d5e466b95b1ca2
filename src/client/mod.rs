//! Client side of the Hub authorization protocol, used by single-user
//! servers.
//!
//! # Data Flow
//! ```text
//! browser request
//!     → middleware.rs (read session cookie)
//!     → cache.rs (recent accepted cookies)
//!     → hub_client.rs (coalesced POST to authorizations/cookie)
//!     → HubUser in request extensions, or 401/403/503
//! ```

pub mod cache;
pub mod hub_client;
pub mod middleware;

pub use cache::IdentityCache;
pub use hub_client::{ClientInitError, HubAuthClient};
pub use middleware::{require_hub_user, HubUserState};
