//! Error types for portsync
//!
//! Every failure a run can hit has its own variant so that the caller can
//! tell "no connectivity" from "no IPv6" from "router automation failed"
//! without parsing messages. [`Error::kind`] folds them into the handful of
//! operator-facing categories.

use crate::address::IpVersion;
use thiserror::Error;

/// Result type alias for portsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for portsync
#[derive(Error, Debug)]
pub enum Error {
    /// Text that is neither a dotted-quad nor a colon-hex address
    #[error("Invalid IP address: {0:?}")]
    InvalidAddress(String),

    /// Lookup service or DNS provider could not be reached
    #[error("Service unreachable: {0}")]
    Unreachable(String),

    /// Lookup returned an address of the other version
    #[error("Requested IP{requested} address but lookup returned {received}")]
    VersionMismatch {
        /// Version that was asked for
        requested: IpVersion,
        /// Text the lookup service returned
        received: String,
    },

    /// DNS provider answered with a non-success status
    #[error("DNS provider {provider} rejected update of record {record_id}")]
    DnsRejected {
        /// Provider name
        provider: String,
        /// Record identifier that was not updated
        record_id: String,
    },

    /// Router session operation called in the wrong state
    #[error("Router session not ready: {0}")]
    NotReady(String),

    /// Post-login marker never appeared
    #[error("Router authentication failed: {0}")]
    Authentication(String),

    /// Mapping page did not load
    #[error("Router navigation failed: {0}")]
    Navigation(String),

    /// No table row matched the mapping name
    #[error("Port mapping entry not found: {name}")]
    MappingNotFound {
        /// Name as configured (before truncation)
        name: String,
    },

    /// Row was selected but the edit could not be completed
    #[error("Failed to edit port mapping entry {name}: {reason}")]
    MappingEdit {
        /// Name as configured (before truncation)
        name: String,
        /// What went wrong
        reason: String,
    },

    /// Element did not become visible within the bound
    #[error("Timed out after {timeout_secs}s waiting for {locator}")]
    ElementTimeout {
        /// Human readable locator
        locator: String,
        /// Bound that was exceeded
        timeout_secs: u64,
    },

    /// Browser automation backend failure
    #[error("Browser driver error: {0}")]
    Driver(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Operator-facing failure categories
///
/// Each category calls for a different response: wait for the network,
/// fix IPv6 on the host, check the provider token, look at the router
/// screenshots, or inspect the local state directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Connectivity,
    NoIpv6,
    InvalidAddress,
    ProviderRejected,
    RouterAutomation,
    State,
    Config,
    Internal,
}

impl Error {
    /// Create an "unreachable" error
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    /// Create a "not ready" error
    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    /// Create a browser driver error
    pub fn driver(msg: impl Into<String>) -> Self {
        Self::Driver(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a mapping edit error
    pub fn mapping_edit(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MappingEdit {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Classify the error for reporting
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Unreachable(_) => FailureKind::Connectivity,
            Error::VersionMismatch {
                requested: IpVersion::V6,
                ..
            } => FailureKind::NoIpv6,
            Error::VersionMismatch { .. } | Error::InvalidAddress(_) => {
                FailureKind::InvalidAddress
            }
            Error::DnsRejected { .. } => FailureKind::ProviderRejected,
            Error::NotReady(_)
            | Error::Authentication(_)
            | Error::Navigation(_)
            | Error::MappingNotFound { .. }
            | Error::MappingEdit { .. }
            | Error::ElementTimeout { .. }
            | Error::Driver(_) => FailureKind::RouterAutomation,
            Error::StateStore(_) | Error::Io(_) => FailureKind::State,
            Error::Config(_) => FailureKind::Config,
            Error::InvalidInput(_) | Error::Json(_) | Error::Other(_) => FailureKind::Internal,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_ipv6_is_distinct_from_unreachable() {
        let no_v6 = Error::VersionMismatch {
            requested: IpVersion::V6,
            received: "203.0.113.7".into(),
        };
        assert_eq!(no_v6.kind(), FailureKind::NoIpv6);
        assert_eq!(
            Error::unreachable("connection refused").kind(),
            FailureKind::Connectivity
        );
    }

    #[test]
    fn automation_failures_share_a_category() {
        let errors = [
            Error::Authentication("marker missing".into()),
            Error::MappingNotFound { name: "nas".into() },
            Error::mapping_edit("nas", "apply button missing"),
            Error::not_ready("authenticate before start"),
        ];
        for err in errors {
            assert_eq!(err.kind(), FailureKind::RouterAutomation, "{err}");
        }
    }

    #[test]
    fn rejected_update_names_the_record() {
        let err = Error::DnsRejected {
            provider: "cloudflare".into(),
            record_id: "rec-1".into(),
        };
        assert_eq!(err.kind(), FailureKind::ProviderRejected);
        assert!(err.to_string().contains("rec-1"));
    }
}
