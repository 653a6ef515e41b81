//! Outcome of one reconciliation

use crate::engine::plan::Mutation;
use crate::error::Error;
use crate::event::AddressChangeEvent;

/// What a reconciliation did and what went wrong
///
/// A report with failures is still a complete account: mutations that
/// succeeded before or after a failure are listed in `applied`.
#[derive(Debug)]
pub struct ReconcileReport {
    /// The event this report belongs to
    pub event: AddressChangeEvent,
    /// Mutations the backends accepted, in the order they were sent
    pub applied: Vec<Mutation>,
    /// Skipped sides and failed backend calls
    pub failures: Vec<Error>,
}

impl ReconcileReport {
    pub fn new(event: AddressChangeEvent) -> Self {
        Self {
            event,
            applied: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// True when nothing failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// True when DNS was already converged
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty() && self.failures.is_empty()
    }

    /// Failures rendered one per line
    pub fn failure_lines(&self) -> Vec<String> {
        self.failures.iter().map(ToString::to_string).collect()
    }

    /// Applied mutations rendered one per line
    pub fn applied_lines(&self) -> Vec<String> {
        self.applied.iter().map(ToString::to_string).collect()
    }

    pub(crate) fn record_failure(&mut self, error: impl Into<Error>) {
        self.failures.push(error.into());
    }
}

impl std::fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} applied, {} failed",
            self.event,
            self.applied.len(),
            self.failures.len()
        )
    }
}
