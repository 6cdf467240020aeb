// # bootdns-core
//
// Core library for boot-time DNS address reconciliation.
//
// ## Architecture Overview
//
// A host that boots with a fresh public address needs its A record to follow.
// This library provides:
// - **DnsProvider**: Trait for hosted-zone DNS APIs (zones, record sets, changes)
// - **MetadataSource**: Trait for discovering the hostname and address to publish
// - **Reconciler**: Resolves the zone, reads the record, applies the minimal change
// - **ProviderRegistry**: Plugin-based registry for providers and metadata sources
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Reconciliation logic is separate from provider APIs
// 2. **Run to Completion**: One hostname, one address, one pass, no background tasks
// 3. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 4. **Stateless**: Everything is read fresh from the provider on each run
// 5. **Idempotency**: Running twice with the same inputs changes nothing the second time

pub mod config;
pub mod error;
pub mod hostname;
pub mod metadata;
pub mod provider;
pub mod reconciler;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use config::{BootDnsConfig, MetadataConfig, ProviderConfig, ReconcileConfig, ReplaceStrategy};
pub use error::{Error, ReconcileError, Result, Stage};
pub use hostname::Hostname;
pub use metadata::StaticMetadata;
pub use provider::MemoryProvider;
pub use reconciler::{Outcome, ReconcileEvent, Reconciler, SkipReason};
pub use registry::ProviderRegistry;
pub use traits::{DnsProvider, MetadataSource};
