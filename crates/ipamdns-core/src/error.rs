//! Error types for the reconciliation system
//!
//! Three kinds of failure matter to callers:
//!
//! - [`Error::NoZone`]: no zone is configured for a name or address. The
//!   affected side of a reconciliation is skipped and reported.
//! - [`Error::Backend`]: a DNS query or mutation failed. Carries enough
//!   context ([`BackendError`]) for an operator to retry by hand.
//! - [`Error::InvalidEvent`]: the inbound event is unusable. Nothing is sent
//!   to DNS.

use std::fmt;
use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// No zone registered for a required name or address
    #[error("Configuration error: no zone configured for {0}")]
    NoZone(String),

    /// Invalid configuration (zone file, backend settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A backend query or mutation failed
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The inbound event cannot be reconciled
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// I/O errors (reading configuration)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a "no zone configured" error
    pub fn no_zone(what: impl Into<String>) -> Self {
        Self::NoZone(what.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid event error
    pub fn invalid_event(msg: impl Into<String>) -> Self {
        Self::InvalidEvent(msg.into())
    }

    /// Whether this error belongs to the configuration class
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NoZone(_) | Self::Config(_))
    }
}

/// Backend operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListForward,
    ListReverse,
    AddForward,
    RemoveForward,
    AddReverse,
    RemoveReverse,
}

impl Operation {
    /// Whether the operation changes DNS
    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::ListForward | Self::ListReverse)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListForward => "list-forward",
            Self::ListReverse => "list-reverse",
            Self::AddForward => "add-forward",
            Self::RemoveForward => "remove-forward",
            Self::AddReverse => "add-reverse",
            Self::RemoveReverse => "remove-reverse",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed query or mutation against a zone
///
/// Timeouts, TSIG rejections, refused updates and malformed responses all
/// end up here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("DNS {operation} failed for {record} in zone {zone}: {message}")]
pub struct BackendError {
    /// What was being attempted
    pub operation: Operation,
    /// Zone apex the backend serves
    pub zone: String,
    /// Record being queried or changed, rendered for operators
    pub record: String,
    /// Transport or server message
    pub message: String,
}

impl BackendError {
    pub fn new(
        operation: Operation,
        zone: impl Into<String>,
        record: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            zone: zone.into(),
            record: record.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_names_operation_zone_and_record() {
        let err = BackendError::new(
            Operation::AddReverse,
            "0.10.in-addr.arpa",
            "5.0.0.10.in-addr.arpa PTR host.example.com",
            "REFUSED",
        );

        let rendered = err.to_string();
        assert!(rendered.contains("add-reverse"));
        assert!(rendered.contains("0.10.in-addr.arpa"));
        assert!(rendered.contains("host.example.com"));
        assert!(rendered.contains("REFUSED"));
    }

    #[test]
    fn classification() {
        assert!(Error::no_zone("host.example.com").is_configuration());
        assert!(Error::config("bad").is_configuration());
        assert!(!Error::invalid_event("no address").is_configuration());
        assert!(Operation::RemoveForward.is_mutation());
        assert!(!Operation::ListReverse.is_mutation());
    }
}
