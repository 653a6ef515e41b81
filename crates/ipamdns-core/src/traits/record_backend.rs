// # Record Backend Trait
//
// Defines the interface for reading and changing forward (A/AAAA) and
// reverse (PTR) records inside one DNS zone.
//
// ## Implementations
//
// - RFC 2136 dynamic update with TSIG: `ipamdns-backend-rfc2136` crate
// - Dry run: `ipamdns_core::backend::DryRunBackend`
// - In-memory: `ipamdns_core::backend::MemoryBackend`
//
// ## Usage
//
// ```rust,ignore
// use ipamdns_core::{AddressFamily, DomainName, RecordBackend};
//
// async fn example(backend: &dyn RecordBackend) -> ipamdns_core::Result<()> {
//     let name = DomainName::parse("host.example.com")?;
//     let current = backend.list_forward(&name, AddressFamily::V4).await?;
//     if current.is_empty() {
//         backend.add_forward(&name, "10.0.0.5".parse().unwrap()).await?;
//     }
//     Ok(())
// }
// ```

use crate::error::BackendError;
use crate::name::{AddressFamily, DomainName};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;

/// Trait for DNS record backends
///
/// One instance serves one zone. The engine decides what must change; a
/// backend only executes single queries and single-record mutations.
///
/// # Thread Safety
///
/// Implementations must be usable from concurrently running reconciliations.
///
/// # Responsibilities
///
/// ## Allowed
/// - Talk to the zone's authoritative server (or provider API) only
/// - Map transport and server failures to [`BackendError`]
///
/// ## Forbidden
/// - Retry or back off (a failed event is re-run by the caller)
/// - Cache records between calls (DNS is the source of truth)
/// - Decide whether a change is needed (owned by the engine)
///
/// # Mutation idempotence
///
/// The engine only issues an add or remove after its own query showed the
/// change was needed, but a concurrent external edit can still make a record
/// present or absent in between. Each implementation documents whether that
/// surfaces as a success-no-op or as an error.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Addresses of `family` currently bound to `name`
    async fn list_forward(
        &self,
        name: &DomainName,
        family: AddressFamily,
    ) -> Result<BTreeSet<IpAddr>, BackendError>;

    /// Names currently bound to `address` through PTR records
    ///
    /// Normally zero or one name; several when the zone has been edited
    /// inconsistently. All of them are returned so stale ones can be
    /// removed.
    async fn list_reverse(&self, address: IpAddr) -> Result<BTreeSet<DomainName>, BackendError>;

    /// Add the forward record `name -> address` (A or AAAA by family)
    async fn add_forward(&self, name: &DomainName, address: IpAddr) -> Result<(), BackendError>;

    /// Remove exactly the forward record `name -> address`
    async fn remove_forward(&self, name: &DomainName, address: IpAddr)
    -> Result<(), BackendError>;

    /// Add the PTR record `address -> name`
    async fn add_reverse(&self, address: IpAddr, name: &DomainName) -> Result<(), BackendError>;

    /// Remove exactly the PTR record `address -> name`
    async fn remove_reverse(&self, address: IpAddr, name: &DomainName)
    -> Result<(), BackendError>;

    /// Zone apex this backend serves
    fn zone(&self) -> &DomainName;

    /// Backend type name (for logging/debugging)
    fn backend_name(&self) -> &'static str;
}

/// Helper trait for constructing backends from configuration
pub trait RecordBackendFactory: Send + Sync {
    /// Create a backend serving `zone`
    fn create(
        &self,
        zone: &DomainName,
        config: &crate::config::BackendConfig,
        settings: &crate::config::BackendSettings,
    ) -> Result<Arc<dyn RecordBackend>, crate::Error>;
}
