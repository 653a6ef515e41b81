//! Zone registry
//!
//! Maps names and addresses to the backend of the zone that owns them.
//! Built once at start-up and never changed afterwards; lookups are
//! longest-suffix matches, so a delegated `lab.example.com` wins over
//! `example.com`, and `0.10.in-addr.arpa` wins over `10.in-addr.arpa`.
//! Matching an address's reverse name against reverse zone apexes is the
//! same as testing membership in the zone's address block.

use crate::config::ServiceConfig;
use crate::backend::DryRunBackend;
use crate::error::{Error, Result};
use crate::name::{DomainName, reverse_name};
use crate::registry::BackendRegistry;
use crate::traits::RecordBackend;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// A zone and the backend that changes it
#[derive(Clone)]
pub struct ZoneBinding {
    pub zone: DomainName,
    pub backend: Arc<dyn RecordBackend>,
}

impl ZoneBinding {
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self {
            zone: backend.zone().clone(),
            backend,
        }
    }

    pub fn is_reverse(&self) -> bool {
        self.zone.reverse_family().is_some()
    }
}

impl std::fmt::Debug for ZoneBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneBinding")
            .field("zone", &self.zone)
            .field("backend", &self.backend.backend_name())
            .finish()
    }
}

/// Ordered, immutable lookup table of zones
#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    /// Forward zones, most specific first
    forward: Vec<ZoneBinding>,
    /// Reverse zones, most specific first
    reverse: Vec<ZoneBinding>,
}

impl ZoneRegistry {
    /// Build a registry from backends, one per zone
    ///
    /// Fails if two backends claim the same zone.
    pub fn new(backends: impl IntoIterator<Item = Arc<dyn RecordBackend>>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut forward = Vec::new();
        let mut reverse = Vec::new();

        for backend in backends {
            let binding = ZoneBinding::new(backend);
            if !seen.insert(binding.zone.clone()) {
                return Err(Error::config(format!(
                    "zone {} is configured twice",
                    binding.zone
                )));
            }
            if binding.is_reverse() {
                reverse.push(binding);
            } else {
                forward.push(binding);
            }
        }

        forward.sort_by_key(|b| std::cmp::Reverse(b.zone.label_count()));
        reverse.sort_by_key(|b| std::cmp::Reverse(b.zone.label_count()));

        Ok(Self { forward, reverse })
    }

    /// Build a registry by creating one backend per configured zone
    ///
    /// With `dry_run` set every backend is wrapped in a [`DryRunBackend`]:
    /// the real zone is queried but never changed.
    pub fn from_config(
        config: &ServiceConfig,
        backends: &BackendRegistry,
        dry_run: bool,
    ) -> Result<Self> {
        config.validate()?;
        let settings = config.backend_settings();

        let mut created: Vec<Arc<dyn RecordBackend>> = Vec::with_capacity(config.zones.len());
        for zone_config in &config.zones {
            let zone = zone_config.zone_name()?;
            let backend = backends.create_backend(&zone, &zone_config.backend, &settings)?;
            info!(
                zone = %zone,
                backend = backend.backend_name(),
                dry_run,
                "Configured zone"
            );
            if dry_run {
                created.push(Arc::new(DryRunBackend::with_reader(backend)));
            } else {
                created.push(backend);
            }
        }

        Self::new(created)
    }

    /// Zone responsible for a forward name
    pub fn forward_zone(&self, name: &DomainName) -> Option<&ZoneBinding> {
        let found = self.forward.iter().find(|b| name.is_within(&b.zone));
        debug!(name = %name, zone = ?found.map(|b| b.zone.as_str()), "Forward zone lookup");
        found
    }

    /// Reverse zone responsible for an address
    pub fn reverse_zone(&self, address: &IpAddr) -> Option<&ZoneBinding> {
        let owner = reverse_name(address);
        let found = self.reverse.iter().find(|b| owner.is_within(&b.zone));
        debug!(address = %address, zone = ?found.map(|b| b.zone.as_str()), "Reverse zone lookup");
        found
    }

    /// All zones, forward first
    pub fn zones(&self) -> impl Iterator<Item = &ZoneBinding> {
        self.forward.iter().chain(self.reverse.iter())
    }

    pub fn len(&self) -> usize {
        self.forward.len() + self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
