//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::HubConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Semicolon-separated list overriding `xsrf.anonymous_ip_cidrs`.
pub const ENV_ANONYMOUS_IP_CIDRS: &str = "HUB_XSRF_ANONYMOUS_IP_CIDRS";

/// Semicolon-separated list overriding `xsrf.anonymous_id_headers`.
pub const ENV_ANONYMOUS_ID_HEADERS: &str = "HUB_XSRF_ANONYMOUS_ID_HEADERS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<HubConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse, apply environment overrides, and validate.
pub fn parse_config(content: &str) -> Result<HubConfig, ConfigError> {
    let mut config: HubConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Validate a configuration built in code (defaults or tests).
pub fn finalize(mut config: HubConfig) -> Result<HubConfig, ConfigError> {
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `HUB_XSRF_*` overrides. Unset or empty variables leave the file
/// values alone.
pub fn apply_env_overrides<F>(config: &mut HubConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(cidrs) = lookup(ENV_ANONYMOUS_IP_CIDRS).filter(|v| !v.trim().is_empty()) {
        config.xsrf.anonymous_ip_cidrs = split_list(&cidrs);
    }
    if let Some(headers) = lookup(ENV_ANONYMOUS_ID_HEADERS).filter(|v| !v.trim().is_empty()) {
        config.xsrf.anonymous_id_headers = split_list(&headers);
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_toml() {
        let config: HubConfig = toml::from_str(
            r#"
            [xsrf]
            anonymous_ip_cidrs = ["10.0.0.0/8", "fd00::/8"]
            window_secs = 600
            "#,
        )
        .unwrap();
        assert_eq!(config.xsrf.window_secs, 600);
        assert_eq!(config.xsrf.anonymous_ip_cidrs.len(), 2);
        assert_eq!(config.xsrf.anonymous_id_headers, vec!["User-Agent".to_string()]);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_cidr_fails_at_load() {
        let err = toml::from_str::<HubConfig>(
            r#"
            [xsrf]
            anonymous_ip_cidrs = ["10.0.0.0/33"]
            "#,
        )
        .map_err(ConfigError::from)
        .and_then(|c| validate_config(&c).map_err(ConfigError::Validation))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("10.0.0.0/33"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = HubConfig::default();
        apply_env_overrides(&mut config, |key| match key {
            ENV_ANONYMOUS_IP_CIDRS => Some("10.0.0.0/8; 192.168.0.0/16;".to_string()),
            ENV_ANONYMOUS_ID_HEADERS => Some("".to_string()),
            _ => None,
        });
        assert_eq!(config.xsrf.anonymous_ip_cidrs, vec!["10.0.0.0/8", "192.168.0.0/16"]);
        assert_eq!(config.xsrf.anonymous_id_headers, vec!["User-Agent"]);
    }
}
