//! Test doubles and common utilities for reconciler contract tests
//!
//! Most tests drive the in-memory provider; the doubles here cover the
//! failure shapes it cannot express (an unreachable API, a hung API).

#![allow(dead_code)]

use bootdns_core::config::{ReconcileConfig, ReplaceStrategy};
use bootdns_core::error::{Error, Result};
use bootdns_core::provider::MemoryProvider;
use bootdns_core::traits::{ChangeBatch, DnsProvider, RecordSet, Zone};
use bootdns_core::Reconciler;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A provider with `example.com.` (Z1) holding `host.example.com.` at the given values
pub fn provider_with_record(values: &[&str]) -> MemoryProvider {
    let provider = MemoryProvider::new();
    provider.add_zone(Zone::new("Z1", "example.com."));
    provider.put_record_set(
        "Z1",
        RecordSet::address(
            "host.example.com.",
            300,
            values.iter().map(|v| v.to_string()).collect(),
        ),
    );
    provider
}

/// A provider with `example.com.` (Z1) and no address records
pub fn provider_without_record() -> MemoryProvider {
    let provider = MemoryProvider::new();
    provider.add_zone(Zone::new("Z1", "example.com."));
    provider
}

/// Reconcile settings with the given replacement strategy
pub fn config(strategy: ReplaceStrategy) -> ReconcileConfig {
    ReconcileConfig {
        replace_strategy: strategy,
        ..ReconcileConfig::default()
    }
}

/// A reconciler driving a clone of `provider`
pub fn reconciler_for(provider: &MemoryProvider, strategy: ReplaceStrategy) -> Reconciler {
    Reconciler::new(Box::new(provider.clone()), &config(strategy))
        .expect("reconciler construction succeeds")
}

/// Values of the A record for `host.example.com.` in Z1, if any
pub fn published_values(provider: &MemoryProvider) -> Option<Vec<String>> {
    provider
        .record_sets("Z1")
        .into_iter()
        .find(|set| set.name == "host.example.com.")
        .map(|set| set.values)
}

/// A provider whose every call fails as if credentials were rejected
pub struct UnreachableProvider {
    calls: Arc<AtomicUsize>,
}

impl UnreachableProvider {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of provider calls made
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Create a new UnreachableProvider that shares its counter with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            calls: Arc::clone(&other.calls),
        }
    }

    fn refuse(&self) -> Error {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Error::auth("The security token included in the request is invalid")
    }
}

#[async_trait::async_trait]
impl DnsProvider for UnreachableProvider {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        Err(self.refuse())
    }

    async fn list_record_sets(&self, _zone_id: &str) -> Result<Vec<RecordSet>> {
        Err(self.refuse())
    }

    async fn submit_change(&self, _zone_id: &str, _batch: &ChangeBatch) -> Result<String> {
        Err(self.refuse())
    }

    fn provider_name(&self) -> &'static str {
        "unreachable"
    }
}

/// A provider that lists zones normally but never answers record listings
pub struct HangingProvider {
    zones: Vec<Zone>,
}

impl HangingProvider {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self { zones }
    }
}

#[async_trait::async_trait]
impl DnsProvider for HangingProvider {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        Ok(self.zones.clone())
    }

    async fn list_record_sets(&self, _zone_id: &str) -> Result<Vec<RecordSet>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }

    async fn submit_change(&self, _zone_id: &str, _batch: &ChangeBatch) -> Result<String> {
        Err(Error::Other("submit_change should not be reached".to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "hanging"
    }
}
