// # Memory DNS Provider
//
// In-memory implementation of DnsProvider.
//
// ## Purpose
//
// Stands in for a hosted-zone provider in tests and local experiments. It
// follows the hosted-zone change rules that the reconciler relies on:
//
// - CREATE conflicts with an existing, well-formed set of the same name and type
// - DELETE must match name, type, TTL and values exactly
// - A batch is applied all-or-nothing (unless atomic batches are disabled)
//
// One rule is looser than Route 53: CREATE overwrites a set with no values
// or no TTL (an alias-style set), where Route 53 rejects the batch with
// InvalidChangeBatch. This lets tests seed malformed leftovers and watch the
// reconciler replace them.
//
// ## Failure Injection
//
// [`MemoryProvider::fail_next`] arms a one-shot failure for a provider
// operation, which is how partial-failure paths are exercised.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::hostname::absolute;
use crate::traits::{Change, ChangeAction, ChangeBatch, DnsProvider, RecordSet, Zone};

/// Provider operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    /// `list_zones`
    ListZones,
    /// `list_record_sets`
    ListRecordSets,
    /// A batch containing a DELETE
    Delete,
    /// A batch containing a CREATE
    Create,
}

/// A batch as it was accepted by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedBatch {
    /// Target zone
    pub zone_id: String,
    /// Provider-assigned change id
    pub change_id: String,
    /// The batch itself
    pub batch: ChangeBatch,
}

#[derive(Debug, Default)]
struct MemoryZones {
    zones: Vec<Zone>,
    record_sets: HashMap<String, Vec<RecordSet>>,
    submitted: Vec<SubmittedBatch>,
    armed_failures: Vec<FailurePoint>,
    non_atomic: bool,
    next_change_id: u64,
}

/// In-memory hosted-zone provider
///
/// Cloning shares the underlying zones, so a test can hand one clone to the
/// reconciler and inspect another.
///
/// # Example
///
/// ```rust
/// use bootdns_core::provider::MemoryProvider;
/// use bootdns_core::traits::{RecordSet, Zone};
///
/// let provider = MemoryProvider::new();
/// provider.add_zone(Zone::new("Z1", "example.com."));
/// provider.put_record_set("Z1", RecordSet::address("host.example.com.", 300, vec!["1.2.3.4".into()]));
/// assert_eq!(provider.record_sets("Z1").len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    inner: Arc<Mutex<MemoryZones>>,
}

impl MemoryProvider {
    /// Create a provider with no zones
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryZones> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a hosted zone
    pub fn add_zone(&self, zone: Zone) {
        let mut guard = self.lock();
        guard.record_sets.entry(zone.id.clone()).or_default();
        guard.zones.push(zone);
    }

    /// Insert a record set directly, bypassing change validation
    pub fn put_record_set(&self, zone_id: &str, record_set: RecordSet) {
        let mut guard = self.lock();
        guard
            .record_sets
            .entry(zone_id.to_string())
            .or_default()
            .push(record_set);
    }

    /// Snapshot of a zone's record sets
    pub fn record_sets(&self, zone_id: &str) -> Vec<RecordSet> {
        self.lock()
            .record_sets
            .get(zone_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every batch accepted so far, in order
    pub fn submitted_batches(&self) -> Vec<SubmittedBatch> {
        self.lock().submitted.clone()
    }

    /// Every accepted change, flattened across batches
    pub fn submitted_changes(&self) -> Vec<Change> {
        self.lock()
            .submitted
            .iter()
            .flat_map(|submitted| submitted.batch.changes.iter().cloned())
            .collect()
    }

    /// Number of accepted batches
    pub fn mutation_count(&self) -> usize {
        self.lock().submitted.len()
    }

    /// Make the next matching operation fail once
    pub fn fail_next(&self, point: FailurePoint) {
        self.lock().armed_failures.push(point);
    }

    /// Report batches as non-atomic
    pub fn without_atomic_batches(self) -> Self {
        self.lock().non_atomic = true;
        self
    }

    fn take_failure(guard: &mut MemoryZones, point: FailurePoint) -> Result<()> {
        if let Some(pos) = guard.armed_failures.iter().position(|p| *p == point) {
            guard.armed_failures.remove(pos);
            return Err(Error::provider(
                "memory",
                format!("injected failure at {:?}", point),
            ));
        }
        Ok(())
    }

    fn apply_change(sets: &mut Vec<RecordSet>, change: &Change) -> Result<()> {
        let wanted = &change.record_set;
        let name = absolute(&wanted.name);
        let same_key = |set: &RecordSet| {
            absolute(&set.name).eq_ignore_ascii_case(&name) && set.record_type == wanted.record_type
        };

        match change.action {
            ChangeAction::Create => {
                if wanted.ttl.is_none() || wanted.values.is_empty() {
                    return Err(Error::provider(
                        "memory",
                        format!("InvalidInput: CREATE {} needs a TTL and values", name),
                    ));
                }
                if let Some(pos) = sets.iter().position(same_key) {
                    if !sets[pos].values.is_empty() && sets[pos].ttl.is_some() {
                        return Err(Error::provider(
                            "memory",
                            format!(
                                "InvalidChangeBatch: {} {} already exists",
                                name, wanted.record_type
                            ),
                        ));
                    }
                    sets.remove(pos);
                }
                sets.push(RecordSet {
                    name,
                    ..wanted.clone()
                });
                Ok(())
            }
            ChangeAction::Delete => {
                let pos = sets
                    .iter()
                    .position(|set| {
                        same_key(set) && set.ttl == wanted.ttl && set.values == wanted.values
                    })
                    .ok_or_else(|| {
                        Error::provider(
                            "memory",
                            format!(
                                "InvalidChangeBatch: {} {} with the given TTL and values not found",
                                name, wanted.record_type
                            ),
                        )
                    })?;
                sets.remove(pos);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl DnsProvider for MemoryProvider {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        let mut guard = self.lock();
        Self::take_failure(&mut guard, FailurePoint::ListZones)?;
        Ok(guard.zones.clone())
    }

    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<RecordSet>> {
        let mut guard = self.lock();
        Self::take_failure(&mut guard, FailurePoint::ListRecordSets)?;
        guard
            .record_sets
            .get(zone_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("NoSuchHostedZone: {}", zone_id)))
    }

    async fn submit_change(&self, zone_id: &str, batch: &ChangeBatch) -> Result<String> {
        let mut guard = self.lock();

        if batch.changes.is_empty() {
            return Err(Error::provider("memory", "InvalidChangeBatch: no changes"));
        }
        if batch.changes.iter().any(|c| c.action == ChangeAction::Delete) {
            Self::take_failure(&mut guard, FailurePoint::Delete)?;
        }
        if batch.changes.iter().any(|c| c.action == ChangeAction::Create) {
            Self::take_failure(&mut guard, FailurePoint::Create)?;
        }

        let non_atomic = guard.non_atomic;
        let sets = guard
            .record_sets
            .get_mut(zone_id)
            .ok_or_else(|| Error::not_found(format!("NoSuchHostedZone: {}", zone_id)))?;

        if non_atomic {
            for change in &batch.changes {
                Self::apply_change(sets, change)?;
            }
        } else {
            let mut staged = sets.clone();
            for change in &batch.changes {
                Self::apply_change(&mut staged, change)?;
            }
            *sets = staged;
        }

        guard.next_change_id += 1;
        let change_id = format!("C{:04}", guard.next_change_id);
        guard.submitted.push(SubmittedBatch {
            zone_id: zone_id.to_string(),
            change_id: change_id.clone(),
            batch: batch.clone(),
        });

        Ok(change_id)
    }

    fn supports_atomic_batches(&self) -> bool {
        !self.lock().non_atomic
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_with_record() -> MemoryProvider {
        let provider = MemoryProvider::new();
        provider.add_zone(Zone::new("Z1", "example.com."));
        provider.put_record_set(
            "Z1",
            RecordSet::address("host.example.com.", 300, vec!["1.2.3.4".to_string()]),
        );
        provider
    }

    #[tokio::test]
    async fn test_create_conflicts_with_existing_set() {
        let provider = provider_with_record();
        let batch = ChangeBatch::new(vec![Change::create(RecordSet::address(
            "host.example.com.",
            60,
            vec!["5.6.7.8".to_string()],
        ))]);

        assert!(provider.submit_change("Z1", &batch).await.is_err());
        assert_eq!(provider.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_requires_matching_ttl() {
        let provider = provider_with_record();
        let batch = ChangeBatch::new(vec![Change::delete(RecordSet::address(
            "host.example.com.",
            60,
            vec!["1.2.3.4".to_string()],
        ))]);

        assert!(provider.submit_change("Z1", &batch).await.is_err());
        assert_eq!(provider.record_sets("Z1").len(), 1);
    }

    #[tokio::test]
    async fn test_atomic_batch_is_all_or_nothing() {
        let provider = provider_with_record();
        // The delete is valid, the create conflicts with another set
        provider.put_record_set(
            "Z1",
            RecordSet::address("other.example.com.", 300, vec!["9.9.9.9".to_string()]),
        );
        let batch = ChangeBatch::new(vec![
            Change::delete(RecordSet::address(
                "host.example.com.",
                300,
                vec!["1.2.3.4".to_string()],
            )),
            Change::create(RecordSet::address(
                "other.example.com.",
                60,
                vec!["5.6.7.8".to_string()],
            )),
        ]);

        assert!(provider.submit_change("Z1", &batch).await.is_err());
        assert_eq!(provider.record_sets("Z1").len(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let provider = provider_with_record();
        provider.fail_next(FailurePoint::ListZones);

        assert!(provider.list_zones().await.is_err());
        assert_eq!(provider.list_zones().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_replaces_valueless_set() {
        let provider = MemoryProvider::new();
        provider.add_zone(Zone::new("Z1", "example.com."));
        provider.put_record_set("Z1", RecordSet::address("host.example.com.", 300, Vec::new()));

        let batch = ChangeBatch::new(vec![Change::create(RecordSet::address(
            "host.example.com.",
            60,
            vec!["5.6.7.8".to_string()],
        ))]);
        let change_id = provider.submit_change("Z1", &batch).await.unwrap();

        assert_eq!(change_id, "C0001");
        let sets = provider.record_sets("Z1");
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].first_value(), Some("5.6.7.8"));
    }

    #[tokio::test]
    async fn test_create_replaces_set_without_ttl() {
        let provider = MemoryProvider::new();
        provider.add_zone(Zone::new("Z1", "example.com."));
        provider.put_record_set(
            "Z1",
            RecordSet {
                ttl: None,
                ..RecordSet::address("host.example.com.", 0, vec!["1.2.3.4".to_string()])
            },
        );

        let batch = ChangeBatch::new(vec![Change::create(RecordSet::address(
            "host.example.com.",
            60,
            vec!["5.6.7.8".to_string()],
        ))]);
        provider.submit_change("Z1", &batch).await.unwrap();

        let sets = provider.record_sets("Z1");
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].ttl, Some(60));
        assert_eq!(sets[0].first_value(), Some("5.6.7.8"));
    }
}
