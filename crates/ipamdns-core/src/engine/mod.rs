//! Reconciliation engine
//!
//! The ReconcileEngine is responsible for:
//! - Finding the zones that own an event's name and address
//! - Observing what DNS currently holds for both
//! - Planning the mutations that make DNS match the event
//! - Applying them one backend call at a time
//!
//! ## Architecture
//!
//! ```text
//! AddressChangeEvent
//!        │
//!        ▼
//! ┌─────────────┐   list_*    ┌───────────────┐
//! │  observe()  │ ──────────▶ │ RecordBackend │  (one per zone)
//! └─────────────┘             └───────────────┘
//!        │ Observation                ▲
//!        ▼                            │ add_* / remove_*
//! ┌─────────────┐  ReconcilePlan ┌─────────────┐
//! │   plan()    │ ─────────────▶ │   apply()   │
//! └─────────────┘                └─────────────┘
//!                                       │
//!                                       ▼
//!                                ReconcileReport
//! ```
//!
//! ## Failure Handling
//!
//! Nothing is rolled back. A side whose zone is missing or whose primary
//! query fails is skipped; the other side still runs. A failed mutation is
//! recorded and the remaining mutations are still sent. Rerunning the same
//! event finishes the job, because every step is a no-op once converged.
//!
//! The engine keeps no state between events and can be shared across tasks.

pub mod plan;
pub mod report;

pub use plan::{ForwardObservation, Mutation, Observation, ReconcilePlan, ReverseObservation};
pub use report::ReconcileReport;

use crate::error::{Error, Result};
use crate::event::AddressChangeEvent;
use crate::name::{AddressFamily, DomainName};
use crate::traits::RecordBackend;
use crate::zones::ZoneRegistry;
use std::collections::BTreeMap;
use std::net::IpAddr;
use tracing::{debug, error, info, warn};

/// Reconciles DNS with IPAM address events
#[derive(Debug, Clone)]
pub struct ReconcileEngine {
    zones: ZoneRegistry,
}

impl ReconcileEngine {
    pub fn new(zones: ZoneRegistry) -> Self {
        Self { zones }
    }

    pub fn zones(&self) -> &ZoneRegistry {
        &self.zones
    }

    /// Parse raw event fields and reconcile
    ///
    /// # Returns
    ///
    /// - `Ok(report)`: The event was usable; check `report.is_success()`
    /// - `Err(Error::InvalidEvent)`: Nothing was sent to DNS
    pub async fn reconcile_raw(&self, address: &str, dns_name: &str) -> Result<ReconcileReport> {
        let event = AddressChangeEvent::parse(address, dns_name)?;
        Ok(self.reconcile(event).await)
    }

    /// Bring DNS in line with one event
    #[tracing::instrument(
        name = "reconcile",
        skip_all,
        fields(address = %event.address, dns_name = ?event.dns_name.as_ref().map(DomainName::as_str))
    )]
    pub async fn reconcile(&self, event: AddressChangeEvent) -> ReconcileReport {
        let (observed, observe_failures) = self.observe(&event).await;
        let plan = plan::plan(&event, &observed);
        debug!(mutations = plan.len(), "Planned reconciliation");

        let mut report = self.apply(event, &plan).await;
        let mut failures = observe_failures;
        failures.append(&mut report.failures);
        report.failures = failures;

        if report.is_noop() {
            debug!("DNS already converged");
        } else if report.is_success() {
            info!(applied = report.applied.len(), "Reconciled");
        } else {
            warn!(
                applied = report.applied.len(),
                failed = report.failures.len(),
                "Reconciled with failures"
            );
        }
        report
    }

    /// Reconcile a deleted address whose former name is known
    ///
    /// Runs the usual reconciliation for the unnamed `event`, which clears
    /// the PTR and the forward record it pointed back to. The former
    /// `name -> address` record is then removed as well, in case no PTR
    /// led to it. A former name outside every configured zone is left alone.
    pub async fn reconcile_deletion(
        &self,
        event: AddressChangeEvent,
        former_name: DomainName,
    ) -> ReconcileReport {
        let address = event.address;
        let mut report = self.reconcile(event).await;

        let Some(backend) = self.forward_backend(&former_name) else {
            return report;
        };
        let current = match backend
            .list_forward(&former_name, AddressFamily::of(&address))
            .await
        {
            Ok(current) => current,
            Err(e) => {
                error!("{}", e);
                report.record_failure(e);
                return report;
            }
        };

        let retirement = plan::plan_retirement(&former_name, address, &current);
        if !retirement.is_empty() {
            let mut retired = self.apply(report.event.clone(), &retirement).await;
            report.applied.append(&mut retired.applied);
            report.failures.append(&mut retired.failures);
        }
        report
    }

    /// Query every record the plan depends on
    ///
    /// Returns the snapshot together with the errors that made a side, or a
    /// cleanup lookup, unobservable.
    pub async fn observe(&self, event: &AddressChangeEvent) -> (Observation, Vec<Error>) {
        let mut failures = Vec::new();
        let forward = match &event.dns_name {
            Some(name) => self.observe_forward(event, name, &mut failures).await,
            None => None,
        };
        let reverse = self.observe_reverse(event, &mut failures).await;

        (Observation { forward, reverse }, failures)
    }

    async fn observe_forward(
        &self,
        event: &AddressChangeEvent,
        name: &DomainName,
        failures: &mut Vec<Error>,
    ) -> Option<ForwardObservation> {
        let Some(binding) = self.zones.forward_zone(name) else {
            warn!(name = %name, "No forward zone configured, skipping forward side");
            failures.push(Error::no_zone(name.as_str()));
            return None;
        };

        let family = event.family();
        let addresses = match binding.backend.list_forward(name, family).await {
            Ok(addresses) => addresses,
            Err(e) => {
                error!("{}", e);
                failures.push(e.into());
                return None;
            }
        };

        let mut other_reverse = BTreeMap::new();
        for other in addresses
            .iter()
            .filter(|a| family.matches(a) && **a != event.address)
        {
            let Some(backend) = self.reverse_backend(other) else {
                continue;
            };
            match backend.list_reverse(*other).await {
                Ok(names) => {
                    other_reverse.insert(*other, names);
                }
                Err(e) => {
                    error!("{}", e);
                    failures.push(e.into());
                }
            }
        }

        Some(ForwardObservation {
            addresses,
            other_reverse,
        })
    }

    async fn observe_reverse(
        &self,
        event: &AddressChangeEvent,
        failures: &mut Vec<Error>,
    ) -> Option<ReverseObservation> {
        let Some(binding) = self.zones.reverse_zone(&event.address) else {
            warn!(address = %event.address, "No reverse zone configured, skipping reverse side");
            failures.push(Error::no_zone(event.reverse_name().as_str()));
            return None;
        };

        let names = match binding.backend.list_reverse(event.address).await {
            Ok(names) => names,
            Err(e) => {
                error!("{}", e);
                failures.push(e.into());
                return None;
            }
        };

        let family = event.family();
        let mut other_forward = BTreeMap::new();
        for other in names.iter().filter(|n| Some(*n) != event.dns_name.as_ref()) {
            let Some(backend) = self.forward_backend(other) else {
                continue;
            };
            match backend.list_forward(other, family).await {
                Ok(addresses) => {
                    other_forward.insert(other.clone(), addresses);
                }
                Err(e) => {
                    error!("{}", e);
                    failures.push(e.into());
                }
            }
        }

        Some(ReverseObservation {
            names,
            other_forward,
        })
    }

    /// Send every mutation in order
    ///
    /// A failure is recorded and does not stop the remaining mutations.
    pub async fn apply(&self, event: AddressChangeEvent, plan: &ReconcilePlan) -> ReconcileReport {
        let mut report = ReconcileReport::new(event);

        for mutation in &plan.mutations {
            let binding = match mutation {
                Mutation::AddForward { .. } | Mutation::RemoveForward { .. } => {
                    self.zones.forward_zone(mutation.name())
                }
                Mutation::AddReverse { .. } | Mutation::RemoveReverse { .. } => {
                    self.zones.reverse_zone(&mutation.address())
                }
            };
            let backend = binding.map(|b| &b.backend);
            let Some(backend) = backend else {
                report.record_failure(Error::no_zone(mutation.record()));
                continue;
            };

            match Self::send(backend.as_ref(), mutation).await {
                Ok(()) => {
                    info!(zone = %backend.zone(), "{}", mutation);
                    report.applied.push(mutation.clone());
                }
                Err(e) => {
                    error!("{}", e);
                    report.record_failure(e);
                }
            }
        }

        report
    }

    async fn send(
        backend: &dyn RecordBackend,
        mutation: &Mutation,
    ) -> std::result::Result<(), crate::error::BackendError> {
        match mutation {
            Mutation::AddForward { name, address } => backend.add_forward(name, *address).await,
            Mutation::RemoveForward { name, address } => {
                backend.remove_forward(name, *address).await
            }
            Mutation::AddReverse { address, name } => backend.add_reverse(*address, name).await,
            Mutation::RemoveReverse { address, name } => {
                backend.remove_reverse(*address, name).await
            }
        }
    }

    /// Backend for cross-zone cleanup of another address
    fn reverse_backend(&self, address: &IpAddr) -> Option<&dyn RecordBackend> {
        let found = self.zones.reverse_zone(address);
        if found.is_none() {
            warn!(address = %address, "No reverse zone for stale address, leaving its PTR alone");
        }
        found.map(|b| b.backend.as_ref())
    }

    /// Backend for cross-zone cleanup of another name
    fn forward_backend(&self, name: &DomainName) -> Option<&dyn RecordBackend> {
        let found = self.zones.forward_zone(name);
        if found.is_none() {
            warn!(name = %name, "No forward zone for stale name, leaving its records alone");
        }
        found.map(|b| b.backend.as_ref())
    }
}
