//! Configuration types for the reconciliation service
//!
//! The zone table is loaded once at start-up from a JSON document:
//!
//! ```json
//! {
//!   "ttl": 3600,
//!   "zones": [
//!     { "name": "example.com",
//!       "backend": { "type": "rfc2136", "server": "ns1.example.com",
//!                    "key": { "name": "ipam", "algorithm": "hmac-sha256", "secret": "c2VjcmV0" } } },
//!     { "network": "192.168.0.0/16", "backend": { "type": "dry_run" } }
//!   ]
//! }
//! ```

use crate::error::{Error, Result};
use crate::name::{DomainName, reverse_zone};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// TTL applied to records the service adds (in seconds)
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Transport timeout for each DNS query or update (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Zones the service may change
    pub zones: Vec<ZoneConfig>,
}

impl ServiceConfig {
    /// Create a configuration with defaults and no zones
    pub fn new() -> Self {
        Self {
            ttl: default_ttl(),
            timeout_secs: default_timeout_secs(),
            zones: Vec::new(),
        }
    }

    /// Parse a JSON document and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read zone file {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Add a zone (builder style, mostly for tests and embedding)
    pub fn with_zone(mut self, zone: ZoneConfig) -> Self {
        self.zones.push(zone);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.zones.is_empty() {
            return Err(Error::config("No zones configured"));
        }

        if self.ttl == 0 {
            return Err(Error::config("ttl must be > 0"));
        }

        if self.timeout_secs == 0 {
            return Err(Error::config("timeout_secs must be > 0"));
        }

        let mut seen = HashSet::new();
        for zone in &self.zones {
            let name = zone.zone_name()?;
            zone.backend.validate()?;
            if !seen.insert(name.clone()) {
                return Err(Error::config(format!("zone {} is configured twice", name)));
            }
        }

        Ok(())
    }

    /// Settings handed to every backend factory
    pub fn backend_settings(&self) -> BackendSettings {
        BackendSettings {
            ttl: self.ttl,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One zone entry
///
/// Exactly one of `name` (a forward zone, or a reverse zone written as an
/// `in-addr.arpa`/`ip6.arpa` name) or `network` (an address block whose
/// reverse zone is derived) must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Zone apex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Address block, e.g. `192.168.0.0/16` or `2001:db8::/32`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    /// Backend that changes this zone
    pub backend: BackendConfig,
}

impl ZoneConfig {
    /// Zone identified by its apex
    pub fn named(name: impl Into<String>, backend: BackendConfig) -> Self {
        Self {
            name: Some(name.into()),
            network: None,
            backend,
        }
    }

    /// Reverse zone identified by an address block
    pub fn network(network: impl Into<String>, backend: BackendConfig) -> Self {
        Self {
            name: None,
            network: Some(network.into()),
            backend,
        }
    }

    /// Resolve the zone apex
    pub fn zone_name(&self) -> Result<DomainName> {
        match (&self.name, &self.network) {
            (Some(name), None) => DomainName::parse(name)
                .map_err(|e| Error::config(format!("invalid zone name '{}': {}", name, e))),
            (None, Some(network)) => {
                let net: IpNetwork = network.parse().map_err(|e| {
                    Error::config(format!("invalid zone network '{}': {}", network, e))
                })?;
                reverse_zone(&net.network(), net.prefix())
            }
            (Some(_), Some(_)) => Err(Error::config(
                "zone must set either 'name' or 'network', not both",
            )),
            (None, None) => Err(Error::config("zone must set 'name' or 'network'")),
        }
    }
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// RFC 2136 dynamic update against the zone primary
    Rfc2136 {
        /// Primary server, `host` or `host:port` (port defaults to 53)
        server: String,
        /// TSIG key; unsigned updates when absent
        #[serde(default)]
        key: Option<TsigKeyConfig>,
    },

    /// Log intended changes, contact nothing
    DryRun,

    /// In-process record store
    Memory,

    /// Custom backend
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl BackendConfig {
    /// Validate the backend configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            BackendConfig::Rfc2136 { server, key } => {
                if server.trim().is_empty() {
                    return Err(Error::config("rfc2136 backend server cannot be empty"));
                }
                if let Some(key) = key {
                    key.validate()?;
                }
                Ok(())
            }
            BackendConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(Error::config("Custom backend factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(Error::config("Custom backend config cannot be null"));
                }
                Ok(())
            }
            BackendConfig::DryRun | BackendConfig::Memory => Ok(()),
        }
    }

    /// Get the backend type name
    pub fn type_name(&self) -> &str {
        match self {
            BackendConfig::Rfc2136 { .. } => "rfc2136",
            BackendConfig::DryRun => "dry_run",
            BackendConfig::Memory => "memory",
            BackendConfig::Custom { factory, .. } => factory,
        }
    }
}

/// TSIG key used to sign dynamic updates
#[derive(Clone, Serialize, Deserialize)]
pub struct TsigKeyConfig {
    /// Key name as known to the server
    pub name: String,

    /// HMAC algorithm
    #[serde(default)]
    pub algorithm: TsigAlgorithm,

    /// Base64-encoded shared secret
    /// ⚠️ NEVER log this value
    pub secret: String,
}

impl TsigKeyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("TSIG key name cannot be empty"));
        }
        if self.secret.trim().is_empty() {
            return Err(Error::config(format!(
                "TSIG key {} has an empty secret",
                self.name
            )));
        }
        Ok(())
    }
}

// Custom Debug implementation that hides the secret
impl fmt::Debug for TsigKeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TsigKeyConfig")
            .field("name", &self.name)
            .field("algorithm", &self.algorithm)
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

/// TSIG HMAC algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TsigAlgorithm {
    #[serde(rename = "hmac-md5")]
    HmacMd5,
    #[serde(rename = "hmac-sha1")]
    HmacSha1,
    #[serde(rename = "hmac-sha224")]
    HmacSha224,
    #[default]
    #[serde(rename = "hmac-sha256")]
    HmacSha256,
    #[serde(rename = "hmac-sha384")]
    HmacSha384,
    #[serde(rename = "hmac-sha512")]
    HmacSha512,
}

/// Settings shared by every backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendSettings {
    /// TTL for added records
    pub ttl: u32,
    /// Per-call transport timeout
    pub timeout: Duration,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            timeout: Duration::from_secs(default_timeout_secs()),
        }
    }
}

fn default_ttl() -> u32 {
    3600
}

fn default_timeout_secs() -> u64 {
    5
}
