//! Resilience subsystem.
//!
//! # Design Decisions
//! - Every call to the Hub has a deadline; expiry means `HubUnreachable`
//! - Only transport failures are retried, never rejections
//! - Backoff is exponential with jitter

pub mod backoff;

pub use backoff::calculate_backoff;
