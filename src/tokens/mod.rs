//! API token lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! Spawner starts instance  → issue(id)      → generation + 1, old token retired
//! Spawner stops instance   → revoke_all(id) → no token valid for id
//! Hub validation request   → resolve(token) → owner or None
//! ```

pub mod store;

pub use store::{ApiTokenStore, InstanceSummary, IssuedToken, TokenOwner};
