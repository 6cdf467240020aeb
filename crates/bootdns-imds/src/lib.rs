// # Instance Metadata Source
//
// This crate provides the EC2 instance metadata source for bootdns.
//
// ## Purpose
//
// At boot, the host discovers what to publish from its own metadata:
// - **Address**: `meta-data/public-ipv4`
// - **Hostname**: the `hostname` entry of the user-data, falling back to
//   the kernel hostname when user-data is unreadable or does not name one
//
// ## Architecture
//
// `ImdsClient` speaks the metadata protocol (session token with IMDSv1
// fallback). It is also used by the Route 53 provider to load instance
// profile credentials.

mod client;
mod user_data;

pub use client::{DEFAULT_IMDS_ENDPOINT, ImdsClient, InstanceCredentials};
pub use user_data::UserData;

use bootdns_core::ProviderRegistry;
use bootdns_core::config::MetadataConfig;
use bootdns_core::traits::{MetadataSource, MetadataSourceFactory};
use bootdns_core::{Error, Result};

use std::path::PathBuf;

/// Where the running kernel reports its hostname
const KERNEL_HOSTNAME_PATH: &str = "/proc/sys/kernel/hostname";

/// Metadata source backed by the instance metadata service
#[derive(Debug)]
pub struct ImdsMetadataSource {
    client: ImdsClient,
    hostname_file: PathBuf,
}

impl ImdsMetadataSource {
    /// Create a metadata source for the given endpoint
    pub fn new(endpoint: Option<String>) -> Result<Self> {
        Ok(Self {
            client: ImdsClient::new(endpoint)?,
            hostname_file: PathBuf::from(KERNEL_HOSTNAME_PATH),
        })
    }

    /// Read the fallback hostname from a different file
    pub fn with_hostname_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.hostname_file = path.into();
        self
    }

    async fn kernel_hostname(&self) -> Result<String> {
        let raw = tokio::fs::read_to_string(&self.hostname_file).await.map_err(|e| {
            Error::metadata(format!(
                "Failed to read hostname from {}: {}",
                self.hostname_file.display(),
                e
            ))
        })?;

        let hostname = raw.trim();
        if hostname.is_empty() {
            return Err(Error::metadata("Kernel hostname is empty"));
        }
        Ok(hostname.to_string())
    }
}

#[async_trait::async_trait]
impl MetadataSource for ImdsMetadataSource {
    async fn hostname(&self) -> Result<String> {
        match self.client.user_data().await {
            Ok(user_data) => {
                if let Some(hostname) = user_data.hostname() {
                    tracing::debug!("Hostname from user-data: {}", hostname);
                    return Ok(hostname.to_string());
                }
            }
            Err(e) => tracing::warn!("Could not read user-data, using kernel hostname: {}", e),
        }

        let hostname = self.kernel_hostname().await?;
        tracing::debug!("Using kernel hostname {}", hostname);
        Ok(hostname)
    }

    async fn public_address(&self) -> Result<String> {
        self.client.public_ipv4().await
    }

    fn source_name(&self) -> &'static str {
        "imds"
    }
}

/// Factory for creating instance metadata sources
pub struct ImdsFactory;

impl MetadataSourceFactory for ImdsFactory {
    fn create(&self, config: &MetadataConfig) -> Result<Box<dyn MetadataSource>> {
        match config {
            MetadataConfig::Imds { endpoint } => {
                Ok(Box::new(ImdsMetadataSource::new(endpoint.clone())?))
            }
            _ => Err(Error::config("Invalid config for instance metadata source")),
        }
    }
}

/// Register the instance metadata source with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_metadata_source("imds", Box::new(ImdsFactory));
}
