//! DNS names, address families and reverse-lookup names

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Reverse zone apex for IPv4
pub const IN_ADDR_ARPA: &str = "in-addr.arpa";

/// Reverse zone apex for IPv6
pub const IP6_ARPA: &str = "ip6.arpa";

/// A validated, normalised domain name
///
/// Stored lower-case without the trailing root dot, so `Host.Example.COM.`
/// and `host.example.com` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName(String);

impl DomainName {
    /// Parse and normalise a domain name
    ///
    /// Applies RFC 1035 length limits. Labels may contain letters, digits,
    /// hyphens and underscores and may not start or end with a hyphen.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let name = trimmed.strip_suffix('.').unwrap_or(trimmed).to_ascii_lowercase();

        if name.is_empty() {
            return Err(Error::invalid_event("domain name cannot be empty"));
        }

        if name.len() > 253 {
            return Err(Error::invalid_event(format!(
                "domain name too long: {} chars (max 253): {}",
                name.len(),
                name
            )));
        }

        for label in name.split('.') {
            if label.is_empty() {
                return Err(Error::invalid_event(format!(
                    "domain name has empty label: '{}'",
                    name
                )));
            }

            if label.len() > 63 {
                return Err(Error::invalid_event(format!(
                    "domain label too long: {} chars (max 63): '{}'",
                    label.len(),
                    label
                )));
            }

            if !label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(Error::invalid_event(format!(
                    "domain label contains invalid characters: '{}'",
                    label
                )));
            }

            if label.starts_with('-') || label.ends_with('-') {
                return Err(Error::invalid_event(format!(
                    "domain label cannot start or end with hyphen: '{}'",
                    label
                )));
            }
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fully-qualified form with the trailing root dot
    pub fn to_fqdn(&self) -> String {
        format!("{}.", self.0)
    }

    /// Number of labels
    pub fn label_count(&self) -> usize {
        self.0.split('.').count()
    }

    /// True if `self` equals `zone` or lies beneath it
    pub fn is_within(&self, zone: &DomainName) -> bool {
        self.0 == zone.0
            || (self.0.len() > zone.0.len()
                && self.0.ends_with(zone.0.as_str())
                && self.0.as_bytes()[self.0.len() - zone.0.len() - 1] == b'.')
    }

    /// Whether this is a name under `in-addr.arpa` or `ip6.arpa`
    pub fn reverse_family(&self) -> Option<AddressFamily> {
        if self.0 == IN_ADDR_ARPA || self.0.ends_with(".in-addr.arpa") {
            Some(AddressFamily::V4)
        } else if self.0 == IP6_ARPA || self.0.ends_with(".ip6.arpa") {
            Some(AddressFamily::V6)
        } else {
            None
        }
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DomainName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DomainName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DomainName> for String {
    fn from(name: DomainName) -> Self {
        name.0
    }
}

/// Address family; selects A vs AAAA and the reverse tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    pub fn of(address: &IpAddr) -> Self {
        match address {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }

    /// Forward record type carrying this family
    pub fn record_type(self) -> &'static str {
        match self {
            Self::V4 => "A",
            Self::V6 => "AAAA",
        }
    }

    pub fn matches(self, address: &IpAddr) -> bool {
        Self::of(address) == self
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.record_type())
    }
}

/// Reverse-lookup name for an address
///
/// `10.7.2.50` → `50.2.7.10.in-addr.arpa`; IPv6 addresses expand to 32
/// nibble labels under `ip6.arpa`.
pub fn reverse_name(address: &IpAddr) -> DomainName {
    match address {
        IpAddr::V4(v4) => DomainName(reverse_v4(v4, 4)),
        IpAddr::V6(v6) => DomainName(reverse_v6(v6, 32)),
    }
}

/// Reverse zone covering the first `prefix_len` bits of `network`
///
/// The prefix must fall on a label boundary: a multiple of 8 for IPv4, of 4
/// for IPv6. Classless delegation is not supported.
pub fn reverse_zone(network: &IpAddr, prefix_len: u8) -> Result<DomainName> {
    match network {
        IpAddr::V4(v4) => {
            if prefix_len > 32 || prefix_len % 8 != 0 {
                return Err(Error::config(format!(
                    "reverse zone for {}/{} must use a prefix that is a multiple of 8",
                    network, prefix_len
                )));
            }
            Ok(DomainName(reverse_v4(v4, usize::from(prefix_len / 8))))
        }
        IpAddr::V6(v6) => {
            if prefix_len > 128 || prefix_len % 4 != 0 {
                return Err(Error::config(format!(
                    "reverse zone for {}/{} must use a prefix that is a multiple of 4",
                    network, prefix_len
                )));
            }
            Ok(DomainName(reverse_v6(v6, usize::from(prefix_len / 4))))
        }
    }
}

fn reverse_v4(address: &Ipv4Addr, octet_count: usize) -> String {
    let mut labels: Vec<String> = address.octets()[..octet_count]
        .iter()
        .rev()
        .map(u8::to_string)
        .collect();
    labels.push(IN_ADDR_ARPA.to_string());
    labels.join(".")
}

fn reverse_v6(address: &Ipv6Addr, nibble_count: usize) -> String {
    let nibbles: Vec<u8> = address
        .octets()
        .iter()
        .flat_map(|b| [b >> 4, b & 0x0f])
        .take(nibble_count)
        .collect();
    let mut labels: Vec<String> = nibbles.iter().rev().map(|n| format!("{:x}", n)).collect();
    labels.push(IP6_ARPA.to_string());
    labels.join(".")
}
