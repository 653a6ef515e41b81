//! Test doubles and common utilities for reconciliation contract tests
//!
//! Every zone is a [`RecordingBackend`] over one shared
//! [`MemoryRecordStore`], so tests can seed DNS, count the calls the engine
//! makes and make chosen operations fail.

#![allow(dead_code)]

use async_trait::async_trait;
use ipamdns_core::backend::{MemoryBackend, MemoryRecordStore};
use ipamdns_core::{
    AddressFamily, BackendError, DomainName, Operation, ReconcileEngine, RecordBackend,
    ZoneRegistry,
};
use std::collections::{BTreeSet, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Counters and failure switches shared by every zone of one test world
#[derive(Debug, Default)]
pub struct CallLog {
    /// Number of add/remove calls that reached a backend
    mutation_count: AtomicUsize,
    /// Number of list calls
    query_count: AtomicUsize,
    /// Mutations in the order they were sent, rendered like `add-forward host.example.com 10.0.0.5`
    mutations: Mutex<Vec<String>>,
    /// Operations that fail until cleared
    failing: Mutex<HashSet<Operation>>,
}

impl CallLog {
    pub fn mutation_count(&self) -> usize {
        self.mutation_count.load(Ordering::SeqCst)
    }

    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }

    pub fn mutations(&self) -> Vec<String> {
        self.mutations.lock().unwrap().clone()
    }

    /// Make every call of `operation` fail
    pub fn fail_on(&self, operation: Operation) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Forget the calls seen so far
    pub fn reset(&self) {
        self.mutation_count.store(0, Ordering::SeqCst);
        self.query_count.store(0, Ordering::SeqCst);
        self.mutations.lock().unwrap().clear();
    }

    fn check(&self, operation: Operation, zone: &DomainName, record: String) -> Result<(), BackendError> {
        if operation.is_mutation() {
            self.mutation_count.fetch_add(1, Ordering::SeqCst);
            self.mutations
                .lock()
                .unwrap()
                .push(format!("{} {}", operation, record));
        } else {
            self.query_count.fetch_add(1, Ordering::SeqCst);
        }

        if self.failing.lock().unwrap().contains(&operation) {
            return Err(BackendError::new(operation, zone.as_str(), record, "SERVFAIL (injected)"));
        }
        Ok(())
    }
}

/// A memory backend that records every call
pub struct RecordingBackend {
    inner: MemoryBackend,
    log: Arc<CallLog>,
}

impl RecordingBackend {
    pub fn new(zone: DomainName, store: MemoryRecordStore, log: Arc<CallLog>) -> Self {
        Self {
            inner: MemoryBackend::new(zone, store),
            log,
        }
    }
}

#[async_trait]
impl RecordBackend for RecordingBackend {
    async fn list_forward(
        &self,
        name: &DomainName,
        family: AddressFamily,
    ) -> Result<BTreeSet<IpAddr>, BackendError> {
        self.log
            .check(Operation::ListForward, self.zone(), format!("{} {}", name, family))?;
        self.inner.list_forward(name, family).await
    }

    async fn list_reverse(&self, address: IpAddr) -> Result<BTreeSet<DomainName>, BackendError> {
        self.log
            .check(Operation::ListReverse, self.zone(), address.to_string())?;
        self.inner.list_reverse(address).await
    }

    async fn add_forward(&self, name: &DomainName, address: IpAddr) -> Result<(), BackendError> {
        self.log
            .check(Operation::AddForward, self.zone(), format!("{} {}", name, address))?;
        self.inner.add_forward(name, address).await
    }

    async fn remove_forward(&self, name: &DomainName, address: IpAddr) -> Result<(), BackendError> {
        self.log
            .check(Operation::RemoveForward, self.zone(), format!("{} {}", name, address))?;
        self.inner.remove_forward(name, address).await
    }

    async fn add_reverse(&self, address: IpAddr, name: &DomainName) -> Result<(), BackendError> {
        self.log
            .check(Operation::AddReverse, self.zone(), format!("{} {}", address, name))?;
        self.inner.add_reverse(address, name).await
    }

    async fn remove_reverse(&self, address: IpAddr, name: &DomainName) -> Result<(), BackendError> {
        self.log
            .check(Operation::RemoveReverse, self.zone(), format!("{} {}", address, name))?;
        self.inner.remove_reverse(address, name).await
    }

    fn zone(&self) -> &DomainName {
        self.inner.zone()
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}

/// A store, an engine over it and the shared call log
pub struct TestWorld {
    pub store: MemoryRecordStore,
    pub engine: ReconcileEngine,
    pub log: Arc<CallLog>,
}

/// Zones used by most tests: one forward zone plus v4 and v6 reverse zones
pub const DEFAULT_ZONES: &[&str] = &[
    "example.com",
    "0.10.in-addr.arpa",
    "8.b.d.0.1.0.0.2.ip6.arpa",
];

pub fn world() -> TestWorld {
    world_with_zones(DEFAULT_ZONES)
}

pub fn world_with_zones(zones: &[&str]) -> TestWorld {
    let store = MemoryRecordStore::new();
    let log = Arc::new(CallLog::default());
    let backends = zones.iter().map(|zone| {
        Arc::new(RecordingBackend::new(name(zone), store.clone(), Arc::clone(&log)))
            as Arc<dyn RecordBackend>
    });
    let engine = ReconcileEngine::new(ZoneRegistry::new(backends).expect("zones are distinct"));

    TestWorld { store, engine, log }
}

pub fn name(s: &str) -> DomainName {
    DomainName::parse(s).expect("valid test name")
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid test address")
}
