//! CIDR origin classification.
//!
//! # Responsibilities
//! - Parse the configured anonymous ranges (IPv4 and IPv6)
//! - Collapse every address inside any range into one shared class
//! - Keep every other address distinct
//!
//! # Design Decisions
//! - All matching addresses map to the same `Anonymous` value regardless of
//!   which range matched; proxies that pick a fresh source address per
//!   request must not cause XSRF mismatches
//! - A universal range (`0.0.0.0/0`, `::/0` or `*`) turns IP differentiation
//!   off completely, including for unparsable input
//! - Unparsable addresses stay distinct under their raw string

use std::net::IpAddr;

use ipnet::IpNet;

use crate::config::validation::ValidationError;

/// Result of classifying a client address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OriginClass {
    /// Inside a configured anonymous range.
    Anonymous,
    /// Fully identified origin: canonical address, or the raw input if it
    /// did not parse.
    Distinct(String),
}

/// Parse a single configured range.
///
/// Bare addresses are accepted as host ranges. Ranges with host bits set
/// (e.g. `10.1.2.3/8`) are rejected as ambiguous.
pub fn parse_range(value: &str) -> Result<IpNet, ValidationError> {
    let value = match value.trim() {
        "*" => "0.0.0.0/0",
        other => other,
    };

    let invalid = |reason: String| ValidationError::InvalidCidr {
        value: value.to_string(),
        reason,
    };

    let net = if value.contains('/') {
        value.parse::<IpNet>().map_err(|e| invalid(e.to_string()))?
    } else {
        let ip = value.parse::<IpAddr>().map_err(|e| invalid(e.to_string()))?;
        IpNet::from(ip)
    };

    if net.trunc() != net {
        return Err(invalid("host bits set".to_string()));
    }
    Ok(net)
}

/// Classifies client addresses against the anonymous ranges.
#[derive(Debug, Clone, Default)]
pub struct CidrClassifier {
    ranges: Vec<IpNet>,
    universal: bool,
}

impl CidrClassifier {
    pub fn new(ranges: Vec<IpNet>) -> Self {
        let universal = ranges.iter().any(|r| r.prefix_len() == 0);
        Self { ranges, universal }
    }

    /// Parse configured range strings, failing on the first bad entry.
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, ValidationError> {
        let ranges = values
            .iter()
            .map(|s| parse_range(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(ranges))
    }

    pub fn ranges(&self) -> &[IpNet] {
        &self.ranges
    }

    /// Classify a raw address string as seen on the request.
    pub fn classify(&self, raw: &str) -> OriginClass {
        if self.universal {
            return OriginClass::Anonymous;
        }
        match raw.trim().parse::<IpAddr>() {
            Ok(ip) => self.classify_ip(ip),
            Err(e) => {
                tracing::warn!(remote_ip = %raw, error = %e, "Unparsable client address, keeping it distinct");
                OriginClass::Distinct(raw.to_string())
            }
        }
    }

    /// Classify a parsed address.
    pub fn classify_ip(&self, ip: IpAddr) -> OriginClass {
        if self.universal {
            return OriginClass::Anonymous;
        }
        let ip = ip.to_canonical();
        if self.ranges.iter().any(|r| r.contains(&ip)) {
            OriginClass::Anonymous
        } else {
            OriginClass::Distinct(ip.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(values: &[&str]) -> CidrClassifier {
        CidrClassifier::parse(values).unwrap()
    }

    #[test]
    fn test_private_range_collapses() {
        let c = classifier(&["10.0.0.0/8"]);
        assert_eq!(c.classify("10.1.2.3"), OriginClass::Anonymous);
        assert_eq!(c.classify("10.9.9.9"), OriginClass::Anonymous);
        assert_eq!(c.classify("10.1.2.3"), c.classify("10.9.9.9"));
    }

    #[test]
    fn test_all_ranges_share_one_class() {
        let c = classifier(&["10.0.0.0/8", "192.168.0.0/16", "fd00::/8"]);
        assert_eq!(c.classify("10.0.0.1"), c.classify("192.168.4.4"));
        assert_eq!(c.classify("192.168.4.4"), c.classify("fd12::1"));
    }

    #[test]
    fn test_outside_addresses_stay_distinct() {
        let c = classifier(&["10.0.0.0/8"]);
        let samples = ["1.2.3.4", "1.2.3.5", "11.0.0.1", "2001:db8::1", "2001:db8::2"];
        for (i, a) in samples.iter().enumerate() {
            for b in &samples[i + 1..] {
                assert_ne!(c.classify(a), c.classify(b), "{} vs {}", a, b);
            }
            assert_eq!(c.classify(a), OriginClass::Distinct(a.to_string()));
        }
    }

    #[test]
    fn test_mapped_ipv6_uses_ipv4_ranges() {
        let c = classifier(&["10.0.0.0/8"]);
        assert_eq!(c.classify("::ffff:10.1.2.3"), OriginClass::Anonymous);
        assert_eq!(
            c.classify("::ffff:1.2.3.4"),
            OriginClass::Distinct("1.2.3.4".to_string())
        );
    }

    #[test]
    fn test_malformed_input_kept_raw() {
        let c = classifier(&["10.0.0.0/8"]);
        assert_eq!(
            c.classify("not-an-ip"),
            OriginClass::Distinct("not-an-ip".to_string())
        );
        assert_ne!(c.classify("not-an-ip"), c.classify("also-bad"));
    }

    #[test]
    fn test_universal_range() {
        for value in ["0.0.0.0/0", "::/0", "*"] {
            let c = classifier(&[value]);
            assert_eq!(c.classify("8.8.8.8"), OriginClass::Anonymous);
            assert_eq!(c.classify("2001:db8::1"), OriginClass::Anonymous);
            assert_eq!(c.classify("garbage"), OriginClass::Anonymous);
        }
    }

    #[test]
    fn test_no_ranges_means_all_distinct() {
        let c = CidrClassifier::default();
        assert_eq!(c.classify("10.1.2.3"), OriginClass::Distinct("10.1.2.3".into()));
    }

    #[test]
    fn test_parse_range_rules() {
        assert_eq!(parse_range("10.1.2.3").unwrap().prefix_len(), 32);
        assert_eq!(parse_range("fd00::1").unwrap().prefix_len(), 128);
        assert!(parse_range("10.1.2.3/8").is_err());
        assert!(parse_range("10.0.0.0/33").is_err());
        assert!(parse_range("nonsense").is_err());
        assert!(parse_range(" 192.168.0.0/16 ").is_ok());
    }
}
