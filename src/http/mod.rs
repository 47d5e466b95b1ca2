//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers, graceful shutdown)
//!     → request.rs (request ID)
//!     → hub routes (validation, admin, login)
//!     → cookies.rs (session cookie parsing and Set-Cookie values)
//! ```

pub mod cookies;
pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HubServer};
