//! Header-based origin identification.
//!
//! Supplements the client address with request headers that are stable for
//! one client over a login (the `User-Agent` by default) and unlikely to be
//! shared across users.

use axum::http::{HeaderMap, HeaderName};

use crate::config::validation::ValidationError;

/// Field delimiter; never valid inside UTF-8 text.
const DELIMITER: u8 = 0xff;

/// Parse configured header names, failing on the first invalid one.
pub fn parse_header_names<S: AsRef<str>>(
    field: &'static str,
    names: &[S],
) -> Result<Vec<HeaderName>, ValidationError> {
    names
        .iter()
        .map(|n| {
            HeaderName::from_bytes(n.as_ref().trim().as_bytes()).map_err(|_| {
                ValidationError::InvalidHeaderName {
                    field,
                    value: n.as_ref().to_string(),
                }
            })
        })
        .collect()
}

/// Deterministic key built from the configured headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HeaderKey(Vec<u8>);

impl HeaderKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Resolves the header component of an origin key.
#[derive(Debug, Clone, Default)]
pub struct HeaderResolver {
    names: Vec<HeaderName>,
}

impl HeaderResolver {
    pub fn new(names: Vec<HeaderName>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[HeaderName] {
        &self.names
    }

    /// Concatenate the configured header values in order. A missing header
    /// contributes an empty segment; with no headers configured the key is
    /// empty.
    pub fn resolve(&self, headers: &HeaderMap) -> HeaderKey {
        let mut key = Vec::new();
        for name in &self.names {
            if let Some(value) = headers.get(name) {
                key.extend_from_slice(value.as_bytes());
            }
            key.push(DELIMITER);
        }
        HeaderKey(key)
    }
}
