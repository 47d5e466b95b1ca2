//! Client address resolution behind proxies.
//!
//! The header chain is explicit configuration: headers are consulted in
//! order and the first one present wins. For comma-separated lists such as
//! `X-Forwarded-For` the last entry is used, since it was appended by the
//! nearest proxy. With no headers configured, or none present, the socket
//! peer address is used.

use std::net::IpAddr;

use axum::http::{HeaderMap, HeaderName};

#[derive(Debug, Clone, Default)]
pub struct ClientIpResolver {
    headers: Vec<HeaderName>,
}

impl ClientIpResolver {
    pub fn new(headers: Vec<HeaderName>) -> Self {
        Self { headers }
    }

    /// Raw client address string; may be unparsable if a header says so.
    pub fn resolve(&self, peer: Option<IpAddr>, headers: &HeaderMap) -> String {
        for name in &self.headers {
            let Some(value) = headers.get(name) else {
                continue;
            };
            let value = String::from_utf8_lossy(value.as_bytes());
            if let Some(last) = value.rsplit(',').map(str::trim).find(|s| !s.is_empty()) {
                return last.to_string();
            }
        }
        peer.map(|ip| ip.to_string()).unwrap_or_default()
    }
}
