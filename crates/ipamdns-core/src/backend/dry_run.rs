// # Dry-Run Record Backend
//
// Logs the mutations the engine decides on without sending them anywhere.
//
// Without a reader every list call returns an empty set, so the engine plans
// as if the zone were empty. Wrapped around a real backend
// (`DryRunBackend::with_reader`) it performs the real queries and only
// suppresses the changes, which shows exactly what a live run would do.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;

use crate::config::{BackendConfig, BackendSettings};
use crate::error::BackendError;
use crate::name::{AddressFamily, DomainName, reverse_name};
use crate::traits::record_backend::{RecordBackend, RecordBackendFactory};
use crate::Error;

/// Backend that never changes DNS
pub struct DryRunBackend {
    zone: DomainName,
    reader: Option<Arc<dyn RecordBackend>>,
}

impl DryRunBackend {
    /// Dry run against an assumed-empty zone
    pub fn new(zone: DomainName) -> Self {
        Self { zone, reader: None }
    }

    /// Dry run that observes the zone through `reader`
    pub fn with_reader(reader: Arc<dyn RecordBackend>) -> Self {
        Self {
            zone: reader.zone().clone(),
            reader: Some(reader),
        }
    }

    pub fn has_reader(&self) -> bool {
        self.reader.is_some()
    }
}

impl std::fmt::Debug for DryRunBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DryRunBackend")
            .field("zone", &self.zone)
            .field("reader", &self.reader.as_ref().map(|r| r.backend_name()))
            .finish()
    }
}

#[async_trait]
impl RecordBackend for DryRunBackend {
    async fn list_forward(
        &self,
        name: &DomainName,
        family: AddressFamily,
    ) -> Result<BTreeSet<IpAddr>, BackendError> {
        match &self.reader {
            Some(reader) => reader.list_forward(name, family).await,
            None => Ok(BTreeSet::new()),
        }
    }

    async fn list_reverse(&self, address: IpAddr) -> Result<BTreeSet<DomainName>, BackendError> {
        match &self.reader {
            Some(reader) => reader.list_reverse(address).await,
            None => Ok(BTreeSet::new()),
        }
    }

    async fn add_forward(&self, name: &DomainName, address: IpAddr) -> Result<(), BackendError> {
        tracing::info!(
            zone = %self.zone,
            "[DRY-RUN] Would add {} {} {}",
            name,
            AddressFamily::of(&address),
            address
        );
        Ok(())
    }

    async fn remove_forward(
        &self,
        name: &DomainName,
        address: IpAddr,
    ) -> Result<(), BackendError> {
        tracing::info!(
            zone = %self.zone,
            "[DRY-RUN] Would remove {} {} {}",
            name,
            AddressFamily::of(&address),
            address
        );
        Ok(())
    }

    async fn add_reverse(&self, address: IpAddr, name: &DomainName) -> Result<(), BackendError> {
        tracing::info!(
            zone = %self.zone,
            "[DRY-RUN] Would add {} PTR {}",
            reverse_name(&address),
            name
        );
        Ok(())
    }

    async fn remove_reverse(
        &self,
        address: IpAddr,
        name: &DomainName,
    ) -> Result<(), BackendError> {
        tracing::info!(
            zone = %self.zone,
            "[DRY-RUN] Would remove {} PTR {}",
            reverse_name(&address),
            name
        );
        Ok(())
    }

    fn zone(&self) -> &DomainName {
        &self.zone
    }

    fn backend_name(&self) -> &'static str {
        "dry_run"
    }
}

/// Factory for dry-run backends
pub struct DryRunBackendFactory;

impl RecordBackendFactory for DryRunBackendFactory {
    fn create(
        &self,
        zone: &DomainName,
        config: &BackendConfig,
        _settings: &BackendSettings,
    ) -> Result<Arc<dyn RecordBackend>, Error> {
        match config {
            BackendConfig::DryRun => Ok(Arc::new(DryRunBackend::new(zone.clone()))),
            _ => Err(Error::config("Invalid config for dry-run backend")),
        }
    }
}
