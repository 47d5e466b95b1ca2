//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Parse every anonymous CIDR range and header name up front
//! - Validate value ranges (windows > 0, timeouts > 0, URLs parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HubConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::HubConfig;
use crate::origin::cidr::parse_range;
use crate::origin::headers::parse_header_names;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid CIDR range {value:?}: {reason}")]
    InvalidCidr { value: String, reason: String },

    #[error("invalid header name {value:?} in {field}")]
    InvalidHeaderName { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("invalid URL {value:?}: {reason}")]
    InvalidUrl { value: String, reason: String },

    #[error("session cookie name must not be empty")]
    EmptyCookieName,

    #[error("admin.api_key must be set to a private value when admin.enabled is true")]
    WeakAdminKey,
}

/// Key shipped in old sample configs; never accepted.
pub const PLACEHOLDER_ADMIN_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Check a configuration, collecting every error.
pub fn validate_config(config: &HubConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_secs" });
    }

    if config.sessions.cookie_name.trim().is_empty() {
        errors.push(ValidationError::EmptyCookieName);
    }
    if config.sessions.max_age_secs == 0 {
        errors.push(ValidationError::Zero { field: "sessions.max_age_secs" });
    }
    if config.sessions.cleanup_interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "sessions.cleanup_interval_secs" });
    }

    errors.extend(validate_xsrf(config));

    if let Err(e) = Url::parse(&config.client.hub_api_url) {
        errors.push(ValidationError::InvalidUrl {
            value: config.client.hub_api_url.clone(),
            reason: e.to_string(),
        });
    }
    if config.client.timeout_ms == 0 {
        errors.push(ValidationError::Zero { field: "client.timeout_ms" });
    }
    if config.client.max_attempts == 0 {
        errors.push(ValidationError::Zero { field: "client.max_attempts" });
    }
    if config.client.cache_max_entries == 0 {
        errors.push(ValidationError::Zero { field: "client.cache_max_entries" });
    }

    if config.admin.enabled {
        let key = config.admin.api_key.trim();
        if key.is_empty() || key == PLACEHOLDER_ADMIN_KEY {
            errors.push(ValidationError::WeakAdminKey);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_xsrf(config: &HubConfig) -> Vec<ValidationError> {
    let xsrf = &config.xsrf;
    let mut errors = Vec::new();

    if xsrf.window_secs == 0 {
        errors.push(ValidationError::Zero { field: "xsrf.window_secs" });
    }

    for spec in &xsrf.anonymous_ip_cidrs {
        if let Err(e) = parse_range(spec) {
            errors.push(e);
        }
    }

    if let Err(e) = parse_header_names("xsrf.anonymous_id_headers", &xsrf.anonymous_id_headers) {
        errors.push(e);
    }
    if let Err(e) = parse_header_names("xsrf.client_ip_headers", &xsrf.client_ip_headers) {
        errors.push(e);
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = HubConfig::default();
        assert!(!config.admin.enabled);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_admin_api_needs_private_key() {
        let mut config = HubConfig::default();
        config.admin.enabled = true;
        assert_eq!(validate_config(&config), Err(vec![ValidationError::WeakAdminKey]));

        config.admin.api_key = format!("  {}  ", PLACEHOLDER_ADMIN_KEY);
        assert_eq!(validate_config(&config), Err(vec![ValidationError::WeakAdminKey]));

        config.admin.api_key = "d41d8cd98f00b204e9800998ecf8427e".into();
        assert!(validate_config(&config).is_ok());

        config.admin.enabled = false;
        config.admin.api_key = String::new();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = HubConfig::default();
        config.xsrf.anonymous_ip_cidrs = vec!["10.0.0.0/8".into(), "not-a-cidr".into(), "10.1.2.3/8".into()];
        config.xsrf.anonymous_id_headers = vec!["Bad Header".into()];
        config.xsrf.window_secs = 0;
        config.client.hub_api_url = "::nope".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::Zero { field: "xsrf.window_secs" }));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidCidr { value, .. } if value == "not-a-cidr")));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidCidr { value, .. } if value == "10.1.2.3/8")));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidHeaderName { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidUrl { .. })));
    }
}
