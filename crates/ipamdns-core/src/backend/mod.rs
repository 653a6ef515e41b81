// # Built-in Record Backends
//
// Backends that need nothing outside the process. The RFC 2136 backend
// lives in its own crate.

pub mod dry_run;
pub mod memory;

pub use dry_run::{DryRunBackend, DryRunBackendFactory};
pub use memory::{MemoryBackend, MemoryBackendFactory, MemoryRecordStore};
