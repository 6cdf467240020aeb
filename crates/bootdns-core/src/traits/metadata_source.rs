// # Metadata Source Trait
//
// Supplies the two inputs of a reconciliation: the hostname to publish and
// the address to publish it at.
//
// ## Implementations
//
// - Static values: `bootdns_core::metadata::StaticMetadata`
// - EC2 instance metadata service: `bootdns-imds` crate

use async_trait::async_trait;

/// Trait for metadata source implementations
///
/// Both values are trusted once returned; the reconciler only checks that
/// they are non-empty.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// The fully-qualified hostname this host should be published under
    async fn hostname(&self) -> Result<String, crate::Error>;

    /// The public IPv4 address of this host
    async fn public_address(&self) -> Result<String, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing metadata sources from configuration
pub trait MetadataSourceFactory: Send + Sync {
    /// Create a MetadataSource instance from configuration
    fn create(
        &self,
        config: &crate::config::MetadataConfig,
    ) -> Result<Box<dyn MetadataSource>, crate::Error>;
}
