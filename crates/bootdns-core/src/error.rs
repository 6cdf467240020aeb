//! Error types for bootdns
//!
//! [`Error`] is what collaborators (providers, metadata sources, config)
//! return. [`ReconcileError`] is what the reconciler hands back to its caller.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for bootdns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for bootdns collaborators
#[derive(Error, Debug)]
pub enum Error {
    /// DNS provider-related errors
    #[error("DNS provider error: {0}")]
    DnsProvider(String),

    /// Metadata source errors
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (from provider or metadata endpoints)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// A provider call did not finish within its deadline
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a DNS provider error
    pub fn dns_provider(msg: impl Into<String>) -> Self {
        Self::DnsProvider(msg.into())
    }

    /// Create a metadata error
    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether a later run could plausibly succeed without operator action
    ///
    /// Nothing is retried within a run; this only feeds log wording.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Timeout(_) | Self::Http(_) | Self::Io(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// The reconciliation step during which a provider call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Listing hosted zones
    ListZones,
    /// Listing record sets of the resolved zone
    ListRecordSets,
    /// Submitting a change batch
    SubmitChange,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ListZones => "zone listing",
            Stage::ListRecordSets => "record listing",
            Stage::SubmitChange => "change submission",
        };
        f.write_str(name)
    }
}

/// Failures surfaced at the reconciler boundary
///
/// [`ReconcileError::ZoneNotFound`] is produced by zone resolution; the
/// top-level `reconcile` call turns it into `Outcome::Skipped` and never
/// returns it.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The DNS provider could not be reached or refused the request
    #[error("DNS provider unavailable during {stage}: {source}")]
    ProviderUnavailable {
        /// Step that failed
        stage: Stage,
        /// Underlying provider error
        #[source]
        source: Error,
    },

    /// No hosted zone is a suffix of the hostname
    #[error("No hosted zone found for {hostname}")]
    ZoneNotFound {
        /// The normalized hostname
        hostname: String,
    },

    /// Hostname or address was empty
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ReconcileError {
    pub(crate) fn provider(stage: Stage, source: Error) -> Self {
        Self::ProviderUnavailable { stage, source }
    }

    /// The step that failed, if a provider call was involved
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::ProviderUnavailable { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_unavailable_names_stage() {
        let err = ReconcileError::provider(
            Stage::ListZones,
            Error::auth("signature does not match"),
        );
        let text = err.to_string();
        assert!(text.contains("zone listing"));
        assert!(text.contains("signature does not match"));
        assert_eq!(err.stage(), Some(Stage::ListZones));
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::Timeout(Duration::from_secs(1)).is_transient());
        assert!(Error::rate_limited("Throttling").is_transient());
        assert!(!Error::auth("InvalidClientTokenId").is_transient());
        assert!(!Error::not_found("NoSuchHostedZone").is_transient());
    }
}
