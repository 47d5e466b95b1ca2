//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + HUB_XSRF_* environment overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, CIDR and header syntax)
//!     → HubConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps the XSRF origin resolver atomically
//! ```
//!
//! # Design Decisions
//! - Invalid CIDR or header syntax fails at load, never at request time
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::ConfigError;
pub use schema::{
    AdminConfig, ClientConfig, HubConfig, ListenerConfig, ObservabilityConfig, SessionConfig,
    TimeoutConfig, XsrfConfig,
};
