//! Request origin classification subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_ip.rs (configured header chain, else socket peer)
//!     → cidr.rs (anonymous range → shared class, else distinct address)
//!     → headers.rs (configured identifying headers → header key)
//!     → OriginKey (class, header key)
//! ```
//!
//! # Design Decisions
//! - Classification is derived per request, never stored
//! - Configuration is parsed once; request-time code cannot fail
//! - Two requests with equal class and header key are indistinguishable

pub mod cidr;
pub mod client_ip;
pub mod headers;

use std::net::IpAddr;

use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::config::schema::XsrfConfig;
use crate::config::validation::ValidationError;

pub use cidr::{CidrClassifier, OriginClass};
pub use client_ip::ClientIpResolver;
pub use headers::{HeaderKey, HeaderResolver};

/// Classified origin of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OriginKey {
    pub class: OriginClass,
    pub header_key: HeaderKey,
}

impl OriginKey {
    /// Unambiguous byte encoding: every field is length-prefixed.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match &self.class {
            OriginClass::Anonymous => out.push(b'A'),
            OriginClass::Distinct(ip) => {
                out.push(b'D');
                push_field(&mut out, ip.as_bytes());
            }
        }
        push_field(&mut out, self.header_key.as_bytes());
        out
    }

    /// Short digest for log lines; raw header values are not logged.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.encode());
        let mut id = URL_SAFE_NO_PAD.encode(digest);
        id.truncate(12);
        id
    }
}

pub(crate) fn push_field(out: &mut Vec<u8>, field: &[u8]) {
    out.extend_from_slice(&(field.len() as u32).to_be_bytes());
    out.extend_from_slice(field);
}

/// Combines the three resolvers into one per-request classification.
#[derive(Debug, Clone, Default)]
pub struct OriginResolver {
    client_ip: ClientIpResolver,
    cidr: CidrClassifier,
    headers: HeaderResolver,
}

impl OriginResolver {
    pub fn new(client_ip: ClientIpResolver, cidr: CidrClassifier, headers: HeaderResolver) -> Self {
        Self {
            client_ip,
            cidr,
            headers,
        }
    }

    /// Build from validated configuration.
    pub fn from_config(config: &XsrfConfig) -> Result<Self, ValidationError> {
        let client_ip = ClientIpResolver::new(headers::parse_header_names(
            "xsrf.client_ip_headers",
            &config.client_ip_headers,
        )?);
        let cidr = CidrClassifier::parse(&config.anonymous_ip_cidrs)?;
        let headers = HeaderResolver::new(headers::parse_header_names(
            "xsrf.anonymous_id_headers",
            &config.anonymous_id_headers,
        )?);
        Ok(Self::new(client_ip, cidr, headers))
    }

    pub fn classifier(&self) -> &CidrClassifier {
        &self.cidr
    }

    /// Classify a request from its socket peer and headers.
    pub fn origin_key(&self, peer: Option<IpAddr>, headers: &HeaderMap) -> OriginKey {
        let raw_ip = self.client_ip.resolve(peer, headers);
        OriginKey {
            class: self.cidr.classify(&raw_ip),
            header_key: self.headers.resolve(headers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn resolver(cidrs: &[&str]) -> OriginResolver {
        let config = XsrfConfig {
            anonymous_ip_cidrs: cidrs.iter().map(|s| s.to_string()).collect(),
            client_ip_headers: Vec::new(),
            ..XsrfConfig::default()
        };
        OriginResolver::from_config(&config).unwrap()
    }

    fn ua(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("user-agent", HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_same_class_same_headers_are_equal() {
        let r = resolver(&["10.0.0.0/8"]);
        let a = r.origin_key(Some("10.1.2.3".parse().unwrap()), &ua("firefox"));
        let b = r.origin_key(Some("10.9.9.9".parse().unwrap()), &ua("firefox"));
        assert_eq!(a, b);
        assert_eq!(a.encode(), b.encode());
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_either_dimension_separates() {
        let r = resolver(&["10.0.0.0/8"]);
        let base = r.origin_key(Some("10.1.2.3".parse().unwrap()), &ua("firefox"));
        let other_ua = r.origin_key(Some("10.1.2.3".parse().unwrap()), &ua("chrome"));
        let other_ip = r.origin_key(Some("8.8.8.8".parse().unwrap()), &ua("firefox"));
        assert_ne!(base.encode(), other_ua.encode());
        assert_ne!(base.encode(), other_ip.encode());
    }

    #[test]
    fn test_encoding_is_unambiguous() {
        // An address that looks like a header key must not collide with it.
        let a = OriginKey {
            class: OriginClass::Distinct("ab".into()),
            header_key: HeaderKey::default(),
        };
        let b = OriginKey {
            class: OriginClass::Distinct("a".into()),
            header_key: headers::HeaderResolver::default().resolve(&HeaderMap::new()),
        };
        assert_ne!(a.encode(), b.encode());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = XsrfConfig {
            anonymous_ip_cidrs: vec!["10.0.0.0/8".into(), "bogus".into()],
            ..XsrfConfig::default()
        };
        assert!(OriginResolver::from_config(&config).is_err());
    }
}
