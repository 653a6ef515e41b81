// # Memory Record Backend
//
// In-memory implementation of RecordBackend.
//
// ## Purpose
//
// Holds A, AAAA and PTR records in process memory. Several backends (one
// per zone) can share a single `MemoryRecordStore`, so forward and reverse
// zones behave like one small DNS namespace.
//
// ## When to Use
//
// - Tests and demos of the reconciliation engine
// - Trying a zone file layout before pointing it at a real server
//
// ## Mutation Semantics
//
// Adding a record that is already present and removing one that is absent
// both succeed without changing anything, mirroring how an RFC 2136 server
// treats such updates.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::{BackendConfig, BackendSettings};
use crate::error::{BackendError, Operation};
use crate::name::{AddressFamily, DomainName, reverse_name};
use crate::traits::record_backend::{RecordBackend, RecordBackendFactory};
use crate::Error;

#[derive(Debug, Default)]
struct Records {
    forward: BTreeSet<(DomainName, IpAddr)>,
    reverse: BTreeSet<(IpAddr, DomainName)>,
}

/// Shared record storage
///
/// # Example
///
/// ```rust,no_run
/// use ipamdns_core::backend::{MemoryBackend, MemoryRecordStore};
/// use ipamdns_core::{DomainName, RecordBackend};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRecordStore::new();
///     let zone = MemoryBackend::new(DomainName::parse("example.com")?, store.clone());
///
///     zone.add_forward(&DomainName::parse("host.example.com")?, "10.0.0.5".parse()?)
///         .await?;
///     assert_eq!(store.len().await, 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<RwLock<Records>>,
}

impl MemoryRecordStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a forward record directly
    pub async fn insert_forward(&self, name: DomainName, address: IpAddr) {
        self.inner.write().await.forward.insert((name, address));
    }

    /// Seed a PTR record directly
    pub async fn insert_reverse(&self, address: IpAddr, name: DomainName) {
        self.inner.write().await.reverse.insert((address, name));
    }

    /// Snapshot of every forward record
    pub async fn forward_records(&self) -> Vec<(DomainName, IpAddr)> {
        self.inner.read().await.forward.iter().cloned().collect()
    }

    /// Snapshot of every PTR record
    pub async fn reverse_records(&self) -> Vec<(IpAddr, DomainName)> {
        self.inner.read().await.reverse.iter().cloned().collect()
    }

    pub async fn has_forward(&self, name: &DomainName, address: IpAddr) -> bool {
        self.inner
            .read()
            .await
            .forward
            .contains(&(name.clone(), address))
    }

    pub async fn has_reverse(&self, address: IpAddr, name: &DomainName) -> bool {
        self.inner
            .read()
            .await
            .reverse
            .contains(&(address, name.clone()))
    }

    /// Total number of records
    pub async fn len(&self) -> usize {
        let guard = self.inner.read().await;
        guard.forward.len() + guard.reverse.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// One zone's view of a [`MemoryRecordStore`]
///
/// Names outside the zone are refused the way a server answers NOTZONE.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    zone: DomainName,
    store: MemoryRecordStore,
}

impl MemoryBackend {
    pub fn new(zone: DomainName, store: MemoryRecordStore) -> Self {
        Self { zone, store }
    }

    pub fn store(&self) -> &MemoryRecordStore {
        &self.store
    }

    fn check_zone(
        &self,
        operation: Operation,
        owner: &DomainName,
        record: impl FnOnce() -> String,
    ) -> Result<(), BackendError> {
        if owner.is_within(&self.zone) {
            Ok(())
        } else {
            Err(BackendError::new(
                operation,
                self.zone.as_str(),
                record(),
                "NOTZONE: owner name is outside the zone",
            ))
        }
    }
}

#[async_trait]
impl RecordBackend for MemoryBackend {
    async fn list_forward(
        &self,
        name: &DomainName,
        family: AddressFamily,
    ) -> Result<BTreeSet<IpAddr>, BackendError> {
        self.check_zone(Operation::ListForward, name, || {
            format!("{} {}", name, family)
        })?;

        let guard = self.store.inner.read().await;
        Ok(guard
            .forward
            .iter()
            .filter(|(owner, address)| owner == name && family.matches(address))
            .map(|(_, address)| *address)
            .collect())
    }

    async fn list_reverse(&self, address: IpAddr) -> Result<BTreeSet<DomainName>, BackendError> {
        let owner = reverse_name(&address);
        self.check_zone(Operation::ListReverse, &owner, || format!("{} PTR", owner))?;

        let guard = self.store.inner.read().await;
        Ok(guard
            .reverse
            .iter()
            .filter(|(a, _)| *a == address)
            .map(|(_, name)| name.clone())
            .collect())
    }

    async fn add_forward(&self, name: &DomainName, address: IpAddr) -> Result<(), BackendError> {
        self.check_zone(Operation::AddForward, name, || {
            format!("{} {} {}", name, AddressFamily::of(&address), address)
        })?;
        self.store
            .inner
            .write()
            .await
            .forward
            .insert((name.clone(), address));
        Ok(())
    }

    async fn remove_forward(
        &self,
        name: &DomainName,
        address: IpAddr,
    ) -> Result<(), BackendError> {
        self.check_zone(Operation::RemoveForward, name, || {
            format!("{} {} {}", name, AddressFamily::of(&address), address)
        })?;
        self.store
            .inner
            .write()
            .await
            .forward
            .remove(&(name.clone(), address));
        Ok(())
    }

    async fn add_reverse(&self, address: IpAddr, name: &DomainName) -> Result<(), BackendError> {
        let owner = reverse_name(&address);
        self.check_zone(Operation::AddReverse, &owner, || {
            format!("{} PTR {}", owner, name)
        })?;
        self.store
            .inner
            .write()
            .await
            .reverse
            .insert((address, name.clone()));
        Ok(())
    }

    async fn remove_reverse(
        &self,
        address: IpAddr,
        name: &DomainName,
    ) -> Result<(), BackendError> {
        let owner = reverse_name(&address);
        self.check_zone(Operation::RemoveReverse, &owner, || {
            format!("{} PTR {}", owner, name)
        })?;
        self.store
            .inner
            .write()
            .await
            .reverse
            .remove(&(address, name.clone()));
        Ok(())
    }

    fn zone(&self) -> &DomainName {
        &self.zone
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for memory backends
///
/// Every backend it creates shares the factory's store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackendFactory {
    store: MemoryRecordStore,
}

impl MemoryBackendFactory {
    pub fn new(store: MemoryRecordStore) -> Self {
        Self { store }
    }
}

impl RecordBackendFactory for MemoryBackendFactory {
    fn create(
        &self,
        zone: &DomainName,
        config: &BackendConfig,
        _settings: &BackendSettings,
    ) -> Result<Arc<dyn RecordBackend>, Error> {
        match config {
            BackendConfig::Memory => Ok(Arc::new(MemoryBackend::new(
                zone.clone(),
                self.store.clone(),
            ))),
            _ => Err(Error::config("Invalid config for memory backend")),
        }
    }
}
