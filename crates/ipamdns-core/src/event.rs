//! Normalised address-change events
//!
//! An event carries only the state after the save. Nothing about the
//! previous address or name is known or assumed; the engine rediscovers it
//! from DNS.

use crate::error::{Error, Result};
use crate::name::{AddressFamily, DomainName, reverse_name};
use std::fmt;
use std::net::IpAddr;

/// One address record as it looks after a save
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressChangeEvent {
    /// The address (family implicit)
    pub address: IpAddr,
    /// Forward name; `None` when the record has no DNS name
    pub dns_name: Option<DomainName>,
}

impl AddressChangeEvent {
    pub fn new(address: IpAddr, dns_name: Option<DomainName>) -> Self {
        Self { address, dns_name }
    }

    /// Build an event from the raw strings an IPAM system sends
    ///
    /// `address` may carry a prefix length (`10.0.0.5/24`), which is
    /// dropped. An empty or whitespace `dns_name` means "no name".
    pub fn parse(address: &str, dns_name: &str) -> Result<Self> {
        let host = address.trim().split('/').next().unwrap_or_default();
        if host.is_empty() {
            return Err(Error::invalid_event("address is missing"));
        }

        let address: IpAddr = host
            .parse()
            .map_err(|e| Error::invalid_event(format!("invalid address '{}': {}", host, e)))?;

        let dns_name = if dns_name.trim().is_empty() {
            None
        } else {
            Some(DomainName::parse(dns_name)?)
        };

        Ok(Self { address, dns_name })
    }

    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.address)
    }

    /// Reverse-lookup name of the event's address
    pub fn reverse_name(&self) -> DomainName {
        reverse_name(&self.address)
    }
}

impl fmt::Display for AddressChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dns_name {
            Some(name) => write!(f, "{} <-> {}", self.address, name),
            None => write!(f, "{} (no name)", self.address),
        }
    }
}
