//! URL validation for SSRF protection.

use std::collections::HashSet;
use std::net::IpAddr;

use ipnet::IpNet;
use url::{Host, Url};

use crate::error::{SecurityError, SecurityResult};

const BLOCKED_V4_CIDRS: &[&str] = &[
    "0.0.0.0/8",
    "10.0.0.0/8",
    "100.64.0.0/10", // Carrier-grade NAT
    "127.0.0.0/8",   // Loopback
    "169.254.0.0/16", // Link-local / cloud metadata
    "172.16.0.0/12",
    "192.0.0.0/24", // IETF special-purpose
    "192.168.0.0/16",
    "198.18.0.0/15", // Benchmarking
];

const BLOCKED_V6_CIDRS: &[&str] = &[
    "::/128",    // Unspecified
    "::1/128",   // Loopback
    "fc00::/7",  // Unique local
    "fe80::/10", // Link-local
];

const BLOCKED_HOSTS: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "::1",
    "0.0.0.0",
    "169.254.169.254",
    "metadata.google.internal",
    "metadata.goog",
    "instance-data",
];

const BLOCKED_SUFFIXES: &[&str] = &[".internal", ".local", ".localhost", ".corp"];

/// URL validator for SSRF protection.
///
/// Rejects:
/// - Non-HTTP(S) schemes (file://, ftp://, gopher://)
/// - Loopback and well-known metadata hosts
/// - Private, link-local, CGNAT and other reserved ranges, including their
///   IPv4-mapped IPv6 forms
/// - Internal-only DNS suffixes (`.internal`, `.local`, `.localhost`, `.corp`)
///
/// Validation is a pure check over the URL text. Resolved addresses are
/// checked separately by [`UrlValidator::is_blocked_ip`].
#[derive(Debug, Clone)]
pub struct UrlValidator {
    /// Allowed URL schemes
    allowed_schemes: HashSet<String>,

    /// Blocked hostnames
    blocked_hosts: HashSet<String>,

    /// Blocked hostname suffixes
    blocked_suffixes: Vec<String>,

    /// Blocked CIDR ranges
    blocked_cidrs: Vec<IpNet>,

    /// Additional allowed hosts (bypass normal validation)
    allowed_hosts: HashSet<String>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlValidator {
    /// Create a new URL validator with default security rules.
    pub fn new() -> Self {
        let blocked_cidrs = BLOCKED_V4_CIDRS
            .iter()
            .chain(BLOCKED_V6_CIDRS)
            .filter_map(|cidr| cidr.parse::<IpNet>().ok())
            .collect();

        Self {
            allowed_schemes: ["http", "https"].into_iter().map(String::from).collect(),
            blocked_hosts: BLOCKED_HOSTS.iter().map(|h| h.to_string()).collect(),
            blocked_suffixes: BLOCKED_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            blocked_cidrs,
            allowed_hosts: HashSet::new(),
        }
    }

    /// Add an allowed host (bypasses validation).
    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.insert(host.into());
        self
    }

    /// Parse and validate a URL string.
    pub fn validate(&self, url: &str) -> SecurityResult<Url> {
        let parsed = Url::parse(url.trim())?;
        self.validate_url(&parsed)?;
        Ok(parsed)
    }

    /// Validate an already-parsed URL.
    pub fn validate_url(&self, url: &Url) -> SecurityResult<()> {
        if !self.allowed_schemes.contains(url.scheme()) {
            return Err(SecurityError::DisallowedScheme(url.scheme().to_string()));
        }

        let host = url.host().ok_or(SecurityError::NoHost)?;
        let (key, ip) = match host {
            Host::Domain(domain) => (domain.trim_end_matches('.').to_ascii_lowercase(), None),
            Host::Ipv4(addr) => (addr.to_string(), Some(IpAddr::V4(addr))),
            Host::Ipv6(addr) => (addr.to_string(), Some(IpAddr::V6(addr))),
        };

        if key.is_empty() {
            return Err(SecurityError::NoHost);
        }

        // Check allowed hosts first (bypass other checks)
        if self.allowed_hosts.contains(&key) {
            return Ok(());
        }

        if self.blocked_hosts.contains(&key) {
            return Err(SecurityError::BlockedHost(key));
        }

        if self
            .blocked_suffixes
            .iter()
            .any(|suffix| key.ends_with(suffix.as_str()))
        {
            return Err(SecurityError::BlockedHost(key));
        }

        if let Some(ip) = ip {
            if self.is_blocked_ip(ip) {
                return Err(SecurityError::BlockedCidr(ip.to_string()));
            }
        }

        Ok(())
    }

    /// Whether a host is on the allow list.
    pub fn is_allowed_host(&self, host: &str) -> bool {
        self.allowed_hosts.contains(host)
    }

    /// Check an address against the blocked ranges.
    ///
    /// IPv4-mapped IPv6 addresses are checked against the IPv4 ranges too.
    pub fn is_blocked_ip(&self, ip: IpAddr) -> bool {
        let mapped = match ip {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4),
            IpAddr::V4(_) => None,
        };

        self.blocked_cidrs
            .iter()
            .any(|cidr| cidr.contains(&ip) || mapped.is_some_and(|m| cidr.contains(&m)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_blocks_localhost() {
        let validator = UrlValidator::new();
        assert!(validator.validate("http://localhost/").is_err());
        assert!(validator.validate("http://localhost./").is_err());
        assert!(validator.validate("http://127.0.0.1/").is_err());
        assert!(validator.validate("http://127.8.9.10/").is_err());
        assert!(validator.validate("http://[::1]/").is_err());
    }

    #[test]
    fn test_blocks_private_ips() {
        let validator = UrlValidator::new();
        assert!(validator.validate("http://10.0.0.1/").is_err());
        assert!(validator.validate("http://172.16.0.1/").is_err());
        assert!(validator.validate("http://172.31.255.255/").is_err());
        assert!(validator.validate("http://192.168.1.1/").is_err());
        assert!(validator.validate("http://100.64.0.1/").is_err());
        assert!(validator.validate("http://192.0.0.8/").is_err());
        assert!(validator.validate("http://198.19.0.1/").is_err());
        assert!(validator.validate("http://0.1.2.3/").is_err());
    }

    #[test]
    fn test_allows_neighbouring_public_ranges() {
        let validator = UrlValidator::new();
        assert!(validator.validate("http://172.32.0.1/").is_ok());
        assert!(validator.validate("http://100.128.0.1/").is_ok());
        assert!(validator.validate("http://198.20.0.1/").is_ok());
    }

    #[test]
    fn test_blocks_ipv6_private_and_mapped() {
        let validator = UrlValidator::new();
        assert!(validator.validate("http://[fd00::1]/").is_err());
        assert!(validator.validate("http://[fe80::1]/").is_err());
        assert!(validator.validate("http://[::ffff:10.0.0.1]/").is_err());
        assert!(validator.validate("http://[::ffff:169.254.169.254]/").is_err());
        assert!(validator.validate("http://[2606:4700::1111]/").is_ok());
    }

    #[test]
    fn test_blocks_metadata_services() {
        let validator = UrlValidator::new();
        assert!(validator.validate("http://169.254.169.254/latest/meta-data/").is_err());
        assert!(validator.validate("http://metadata.google.internal/").is_err());
        assert!(validator.validate("http://metadata.goog/").is_err());
    }

    #[test]
    fn test_blocks_internal_suffixes() {
        let validator = UrlValidator::new();
        assert!(validator.validate("http://db.internal/").is_err());
        assert!(validator.validate("http://printer.local/").is_err());
        assert!(validator.validate("http://app.localhost/").is_err());
        assert!(validator.validate("https://wiki.corp/").is_err());
        assert!(validator.validate("https://corp.example.com/").is_ok());
    }

    #[test]
    fn test_blocks_numeric_host_encodings() {
        // The URL parser normalizes these to dotted IPv4 first.
        let validator = UrlValidator::new();
        assert!(validator.validate("http://2130706433/").is_err());
        assert!(validator.validate("http://0x7f.0.0.1/").is_err());
    }

    #[test]
    fn test_blocks_non_http() {
        let validator = UrlValidator::new();
        assert!(matches!(
            validator.validate("file:///etc/passwd"),
            Err(SecurityError::DisallowedScheme(_))
        ));
        assert!(validator.validate("ftp://example.com/").is_err());
        assert!(validator.validate("gopher://example.com/").is_err());
        assert!(validator.validate("not a url").is_err());
    }

    #[test]
    fn test_allows_public_urls() {
        let validator = UrlValidator::new();
        assert!(validator.validate("https://example.com/").is_ok());
        assert!(validator.validate("http://shop.example.com/product/1?x=2").is_ok());
    }

    #[test]
    fn test_allowed_hosts_bypass() {
        let validator = UrlValidator::new().allow_host("127.0.0.1");
        assert!(validator.validate("http://127.0.0.1:8080/").is_ok());
        assert!(validator.validate("http://localhost:8080/").is_err());
    }

    proptest! {
        #[test]
        fn prop_rejects_ten_slash_eight(b in 0u8..=255, c in 0u8..=255, d in 0u8..=255) {
            let url = format!("http://10.{b}.{c}.{d}/");
            prop_assert!(UrlValidator::new().validate(&url).is_err());
        }

        #[test]
        fn prop_rejects_private_172(b in 16u8..=31, c in 0u8..=255, d in 0u8..=255) {
            let url = format!("https://172.{b}.{c}.{d}/path");
            prop_assert!(UrlValidator::new().validate(&url).is_err());
        }

        #[test]
        fn prop_rejects_link_local_and_mapped(c in 0u8..=255, d in 0u8..=255) {
            let validator = UrlValidator::new();
            let plain = format!("http://169.254.{c}.{d}/");
            let mapped = format!("http://[::ffff:169.254.{c}.{d}]/");
            prop_assert!(validator.validate(&plain).is_err());
            prop_assert!(validator.validate(&mapped).is_err());
        }
    }
}
