// # ipamdns-core
//
// Core library for keeping DNS in step with an IPAM system.
//
// ## Architecture Overview
//
// Every saved address record becomes one reconciliation:
// - **AddressChangeEvent**: Normalised address and optional DNS name
// - **ZoneRegistry**: Finds the forward and reverse zone that own a record
// - **RecordBackend**: Trait for querying and changing records in one zone
// - **ReconcileEngine**: Observes DNS, plans the changes, applies them
// - **BackendRegistry**: Plugin-based registry for record backends
//
// ## Design Principles
//
// 1. **DNS is the only state**: Nothing is cached or persisted between events
// 2. **Pure planning**: Decisions are made on a snapshot, away from I/O
// 3. **Plugin-Based**: Backends are registered by name, no hard-coded if-else
// 4. **Library-First**: The daemon is a thin shell over this crate
// 5. **Idempotency**: Rerunning an event against converged DNS changes nothing

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod name;
pub mod registry;
pub mod traits;
pub mod zones;

// Re-export core types for convenience
pub use config::{BackendConfig, BackendSettings, ServiceConfig, TsigAlgorithm, TsigKeyConfig, ZoneConfig};
pub use engine::{Mutation, Observation, ReconcileEngine, ReconcilePlan, ReconcileReport};
pub use error::{BackendError, Error, Operation, Result};
pub use event::AddressChangeEvent;
pub use name::{AddressFamily, DomainName};
pub use registry::BackendRegistry;
pub use traits::{RecordBackend, RecordBackendFactory};
pub use zones::{ZoneBinding, ZoneRegistry};
