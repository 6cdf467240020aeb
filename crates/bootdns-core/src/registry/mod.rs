//! Plugin-based provider registry
//!
//! The registry allows DNS providers and metadata sources to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bootdns_core::registry::ProviderRegistry;
//! use bootdns_core::config::ProviderConfig;
//!
//! let registry = ProviderRegistry::new();
//! bootdns_provider_route53::register(&registry);
//!
//! let provider = registry.create_provider(&ProviderConfig::default())?;
//! ```
//!
//! ## Registration
//!
//! Implementation crates register themselves during initialization:
//!
//! ```rust,ignore
//! pub fn register(registry: &ProviderRegistry) {
//!     registry.register_provider("route53", Box::new(Route53Factory));
//! }
//! ```

use crate::config::{MetadataConfig, ProviderConfig};
use crate::error::{Error, Result};
use crate::metadata::StaticMetadataFactory;
use crate::traits::{DnsProvider, DnsProviderFactory, MetadataSource, MetadataSourceFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Registry for plugin-based provider and metadata source creation
///
/// The registry maintains a map of type names to factory objects,
/// allowing dynamic instantiation based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
pub struct ProviderRegistry {
    /// Registered DNS provider factories
    providers: RwLock<HashMap<String, Box<dyn DnsProviderFactory>>>,

    /// Registered metadata source factories
    metadata_sources: RwLock<HashMap<String, Box<dyn MetadataSourceFactory>>>,
}

impl ProviderRegistry {
    /// Create a registry with the built-in `static` metadata source
    pub fn new() -> Self {
        let registry = Self {
            providers: RwLock::new(HashMap::new()),
            metadata_sources: RwLock::new(HashMap::new()),
        };
        registry.register_metadata_source("static", Box::new(StaticMetadataFactory));
        registry
    }

    /// Register a DNS provider factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "route53")
    /// - `factory`: Factory object for creating provider instances
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn DnsProviderFactory>) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        providers.insert(name.into(), factory);
    }

    /// Register a metadata source factory
    ///
    /// # Parameters
    ///
    /// - `name`: Metadata source type name (e.g., "imds")
    /// - `factory`: Factory object for creating metadata source instances
    pub fn register_metadata_source(
        &self,
        name: impl Into<String>,
        factory: Box<dyn MetadataSourceFactory>,
    ) {
        let mut sources = self
            .metadata_sources
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        sources.insert(name.into(), factory);
    }

    /// Create a DNS provider from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsProvider>)`: Created provider instance
    /// - `Err(Error)`: If provider type is not registered or creation fails
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let provider_type = config.type_name();
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = providers
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// Create a metadata source from configuration
    pub fn create_metadata_source(&self, config: &MetadataConfig) -> Result<Box<dyn MetadataSource>> {
        let source_type = config.type_name();
        let sources = self
            .metadata_sources
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = sources.get(source_type).ok_or_else(|| {
            Error::config(format!("Unknown metadata source type: {}", source_type))
        })?;

        factory.create(config)
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Check if a metadata source type is registered
    pub fn has_metadata_source(&self, name: &str) -> bool {
        self.metadata_sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
