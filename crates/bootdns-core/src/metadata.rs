//! Static metadata source
//!
//! Used when the hostname and address are handed to the process directly
//! instead of being discovered.

use async_trait::async_trait;

use crate::config::MetadataConfig;
use crate::error::{Error, Result};
use crate::traits::{MetadataSource, MetadataSourceFactory};

/// Metadata source returning fixed values
#[derive(Debug, Clone)]
pub struct StaticMetadata {
    hostname: String,
    address: String,
}

impl StaticMetadata {
    /// Create a static metadata source
    pub fn new(hostname: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            address: address.into(),
        }
    }
}

#[async_trait]
impl MetadataSource for StaticMetadata {
    async fn hostname(&self) -> Result<String> {
        Ok(self.hostname.clone())
    }

    async fn public_address(&self) -> Result<String> {
        Ok(self.address.clone())
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// Factory for static metadata sources
pub struct StaticMetadataFactory;

impl MetadataSourceFactory for StaticMetadataFactory {
    fn create(&self, config: &MetadataConfig) -> Result<Box<dyn MetadataSource>> {
        match config {
            MetadataConfig::Static { hostname, address } => {
                Ok(Box::new(StaticMetadata::new(hostname.clone(), address.clone())))
            }
            _ => Err(Error::config("Invalid config for static metadata source")),
        }
    }
}
