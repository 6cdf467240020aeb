//! Configuration types for bootdns
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default TTL for created address records (seconds)
pub const DEFAULT_RECORD_TTL: u32 = 60;

/// Default bound on a single provider call (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Main bootdns configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootDnsConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Where the hostname and address come from
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Reconciliation settings
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl BootDnsConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;
        self.metadata.validate()?;
        self.reconcile.validate()?;

        Ok(())
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Amazon Route 53
    Route53 {
        /// Explicit access key; falls back to the environment, then the
        /// instance profile
        #[serde(default)]
        access_key_id: Option<String>,
        /// Explicit secret key
        #[serde(default)]
        secret_access_key: Option<String>,
        /// Session token for temporary credentials
        #[serde(default)]
        session_token: Option<String>,
        /// API endpoint override (e.g. for a partition or a test server)
        #[serde(default)]
        endpoint: Option<String>,
        /// Signing region override
        #[serde(default)]
        region: Option<String>,
        /// Perform reads but only log mutations
        #[serde(default)]
        dry_run: bool,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Route53 {
                access_key_id,
                secret_access_key,
                endpoint,
                ..
            } => {
                if access_key_id.is_some() != secret_access_key.is_some() {
                    return Err(crate::Error::config(
                        "Route 53 access key id and secret access key must be set together",
                    ));
                }
                if access_key_id.as_ref().is_some_and(|k| k.is_empty()) {
                    return Err(crate::Error::config("Route 53 access key id cannot be empty"));
                }
                if let Some(endpoint) = endpoint
                    && !endpoint.starts_with("https://")
                    && !endpoint.starts_with("http://")
                {
                    return Err(crate::Error::config(format!(
                        "Route 53 endpoint must be an HTTP(S) URL. Got: {}",
                        endpoint
                    )));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Route53 { .. } => "route53",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Route53 {
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            endpoint: None,
            region: None,
            dry_run: false,
        }
    }
}

// Secrets stay out of Debug output
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Route53 {
                access_key_id,
                endpoint,
                region,
                dry_run,
                ..
            } => f
                .debug_struct("Route53")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"<REDACTED>")
                .field("session_token", &"<REDACTED>")
                .field("endpoint", endpoint)
                .field("region", region)
                .field("dry_run", dry_run)
                .finish(),
            ProviderConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", &"<REDACTED>")
                .finish(),
        }
    }
}

/// Metadata source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetadataConfig {
    /// Values supplied directly by the caller
    Static {
        /// Hostname to publish
        hostname: String,
        /// Address to publish
        address: String,
    },

    /// EC2 instance metadata service
    Imds {
        /// Endpoint override (defaults to the link-local service address)
        #[serde(default)]
        endpoint: Option<String>,
    },

    /// Custom metadata source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl MetadataConfig {
    /// Validate the metadata configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            MetadataConfig::Static { hostname, address } => {
                if hostname.trim().is_empty() {
                    return Err(crate::Error::config("Static hostname cannot be empty"));
                }
                if address.trim().is_empty() {
                    return Err(crate::Error::config("Static address cannot be empty"));
                }
                Ok(())
            }
            MetadataConfig::Imds { .. } => Ok(()),
            MetadataConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom metadata factory cannot be empty",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the metadata source type name
    pub fn type_name(&self) -> &str {
        match self {
            MetadataConfig::Static { .. } => "static",
            MetadataConfig::Imds { .. } => "imds",
            MetadataConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        MetadataConfig::Imds { endpoint: None }
    }
}

/// How a stale record is replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceStrategy {
    /// Delete and create in one batch when the provider applies batches
    /// atomically; sequential otherwise
    #[default]
    Atomic,
    /// Delete in one batch, create in a second one
    Sequential,
}

/// Reconciliation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// TTL of created records (seconds)
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Bound on each provider call (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Stale-record replacement strategy
    #[serde(default)]
    pub replace_strategy: ReplaceStrategy,
}

impl ReconcileConfig {
    /// Validate the reconcile settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.ttl == 0 {
            return Err(crate::Error::config("Record TTL must be > 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("Request timeout must be > 0"));
        }
        Ok(())
    }

    /// Per-call timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            request_timeout_secs: default_request_timeout_secs(),
            replace_strategy: ReplaceStrategy::default(),
        }
    }
}

fn default_ttl() -> u32 {
    DEFAULT_RECORD_TTL
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
