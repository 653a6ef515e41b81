//! Core traits for the reconciliation system
//!
//! - [`RecordBackend`]: Query and change A, AAAA and PTR records in one zone
//! - [`RecordBackendFactory`]: Create backends from zone configuration

pub mod record_backend;

pub use record_backend::{RecordBackend, RecordBackendFactory};
