//! Hub-side login sessions.

pub mod store;

pub use store::{run_cleanup, Session, SessionStore};
