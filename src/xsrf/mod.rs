//! XSRF protection subsystem.
//!
//! # Data Flow
//! ```text
//! Request:
//!     → check.rs (needs a check? which binding?)
//!     → origin (classify client for anonymous requests)
//!     → engine.rs (recompute expected token for current/previous windows)
//!     → accept, or 403 with a generic message
//! ```
//!
//! # Design Decisions
//! - Stateless: no token storage, only the secret and the clock
//! - Verification never errors; failure is `false`

pub mod check;
pub mod engine;

pub use check::{
    form_token, needs_check, query_token, xsrf_middleware, TokenAuthenticated, XsrfGuard,
    XsrfRejected, XsrfToken, XSRF_FIELD,
};
pub use engine::{XsrfBinding, XsrfEngine};
