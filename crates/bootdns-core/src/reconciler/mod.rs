//! Boot-time DNS reconciler
//!
//! The Reconciler is responsible for:
//! - Resolving the hosted zone a hostname belongs to
//! - Looking up the existing address record
//! - Deciding whether a change is needed
//! - Submitting the change, and reporting what happened
//!
//! ## Architecture
//!
//! ```text
//! hostname, address
//!        │
//!        ▼
//! ┌──────────────┐  list_zones        ┌─────────────┐
//! │  Reconciler  │ ─────────────────► │ DnsProvider │
//! │              │  list_record_sets  │             │
//! │              │ ─────────────────► │             │
//! │              │  submit_change     │             │
//! │              │ ─────────────────► │             │
//! └──────────────┘                    └─────────────┘
//!        │
//!        ▼
//!  Outcome / ReconcileError  (+ ReconcileEvent stream)
//! ```
//!
//! ## Flow
//!
//! 1. Normalize the hostname (trailing ".")
//! 2. Resolve the zone; no zone means `Outcome::Skipped`
//! 3. Look up the A record set for the hostname
//! 4. Classify and apply (see [`apply`])
//!
//! Every provider call is awaited before the next starts and is bounded by
//! the configured request timeout. Nothing is retried within a run: the next
//! run re-reads all state from the provider, so a run that stops between a
//! delete and its create leaves no record and the next run creates it.

pub mod apply;
pub mod record;
pub mod zone;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use crate::config::{ReconcileConfig, ReplaceStrategy};
use crate::error::{Error, ReconcileError, Stage};
use crate::hostname::Hostname;
use crate::traits::{Change, ChangeAction, ChangeBatch, DnsProvider, RecordSet, Zone};

use apply::{Plan, classify, plan};
use record::{malformed_reason, select_address_record};
use zone::select_zone;

/// Why a reconciliation did nothing on purpose
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No hosted zone is a suffix of the hostname
    NoMatchingZone {
        /// The normalized hostname
        hostname: String,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoMatchingZone { hostname } => {
                write!(f, "no hosted zone matches {}", hostname)
            }
        }
    }
}

/// Result of a successful reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No record existed; one was created
    Created {
        /// The normalized hostname
        hostname: String,
        /// The published address
        address: String,
    },
    /// A stale record was replaced
    Updated {
        /// The normalized hostname
        hostname: String,
        /// The address the record held before
        previous: String,
        /// The published address
        address: String,
    },
    /// The record already held the address; nothing was submitted
    Unchanged {
        /// The normalized hostname
        hostname: String,
        /// The address the record holds
        address: String,
    },
    /// The DNS update was skipped
    Skipped(SkipReason),
}

impl Outcome {
    /// Whether the provider was mutated
    pub fn changed(&self) -> bool {
        matches!(self, Outcome::Created { .. } | Outcome::Updated { .. })
    }

    /// Whether the update was skipped
    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created { hostname, address } => {
                write!(f, "created {} -> {}", hostname, address)
            }
            Outcome::Updated {
                hostname,
                previous,
                address,
            } => write!(f, "updated {} -> {} (was {})", hostname, address, previous),
            Outcome::Unchanged { hostname, address } => {
                write!(f, "{} already points to {}", hostname, address)
            }
            Outcome::Skipped(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// The hosted zone was resolved
    ZoneResolved {
        hostname: String,
        zone_id: String,
        zone_name: String,
    },

    /// An address record was found
    RecordObserved {
        hostname: String,
        ttl: Option<u32>,
        values: Vec<String>,
    },

    /// A record was found but could not be interpreted
    MalformedRecordIgnored { hostname: String, reason: String },

    /// A change batch was accepted by the provider
    ChangeSubmitted {
        zone_id: String,
        change_id: String,
        actions: Vec<ChangeAction>,
    },

    /// The reconciliation finished
    Completed {
        outcome: Outcome,
        finished_at: DateTime<Utc>,
    },

    /// The reconciliation failed
    Failed { stage: Option<Stage>, error: String },
}

/// Reconciles one hostname's A record with a hosted-zone provider
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Optionally attach an event channel with [`Reconciler::with_events()`]
/// 3. Call [`Reconciler::reconcile()`] once per run
///
/// The provider is owned exclusively by the reconciler; no locking is needed.
pub struct Reconciler {
    /// DNS provider
    provider: Box<dyn DnsProvider>,

    /// TTL of created records
    ttl: u32,

    /// Bound on each provider call
    request_timeout: Duration,

    /// Stale-record replacement strategy
    replace_strategy: ReplaceStrategy,

    /// Event sender for external monitoring
    event_tx: Option<mpsc::Sender<ReconcileEvent>>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `provider`: DNS provider implementation
    /// - `config`: Reconciliation settings
    pub fn new(
        provider: Box<dyn DnsProvider>,
        config: &ReconcileConfig,
    ) -> crate::Result<Self> {
        config.validate()?;

        Ok(Self {
            provider,
            ttl: config.ttl,
            request_timeout: config.request_timeout(),
            replace_strategy: config.replace_strategy,
            event_tx: None,
        })
    }

    /// Attach a bounded event channel
    ///
    /// When the channel is full, events are dropped with a warning.
    pub fn with_events(mut self, capacity: usize) -> (Self, mpsc::Receiver<ReconcileEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.event_tx = Some(tx);
        (self, rx)
    }

    /// Synchronize `hostname`'s A record with `address`
    ///
    /// # Returns
    ///
    /// - `Ok(Outcome)`: Created, Updated, Unchanged, or Skipped
    /// - `Err(ReconcileError)`: Invalid input, or the provider was unavailable
    pub async fn reconcile(&self, hostname: &str, address: &str) -> Result<Outcome, ReconcileError> {
        let result = self.run(hostname, address).await;

        match &result {
            Ok(outcome) => {
                info!("DNS reconciliation finished: {}", outcome);
                self.emit_event(ReconcileEvent::Completed {
                    outcome: outcome.clone(),
                    finished_at: Utc::now(),
                });
            }
            Err(e) => {
                error!("DNS reconciliation failed: {}", e);
                self.emit_event(ReconcileEvent::Failed {
                    stage: e.stage(),
                    error: e.to_string(),
                });
            }
        }

        result
    }

    async fn run(&self, hostname: &str, address: &str) -> Result<Outcome, ReconcileError> {
        let hostname =
            Hostname::parse(hostname).map_err(|e| ReconcileError::InvalidInput(e.to_string()))?;
        let address = address.trim();
        if address.is_empty() {
            return Err(ReconcileError::InvalidInput(
                "address cannot be empty".to_string(),
            ));
        }

        info!("Hostname: {}", hostname);
        info!("Current IP: {}", address);

        let zone = match self.resolve_zone(&hostname).await {
            Ok(zone) => zone,
            Err(ReconcileError::ZoneNotFound { hostname }) => {
                info!("Unable to find a hosted zone for {}, skipping DNS update", hostname);
                return Ok(Outcome::Skipped(SkipReason::NoMatchingZone { hostname }));
            }
            Err(e) => return Err(e),
        };

        let existing = self.find_address_record(&zone, &hostname).await?;

        self.apply(&zone, &hostname, address, existing.as_ref()).await
    }

    /// Resolve the hosted zone `hostname` belongs to
    ///
    /// # Returns
    ///
    /// - `Ok(Zone)`: The most specific matching zone
    /// - `Err(ReconcileError::ZoneNotFound)`: No zone matches
    /// - `Err(ReconcileError::ProviderUnavailable)`: Zone listing failed
    pub async fn resolve_zone(&self, hostname: &Hostname) -> Result<Zone, ReconcileError> {
        let zones = self
            .bounded(Stage::ListZones, self.provider.list_zones())
            .await?;
        debug!("Provider {} listed {} zone(s)", self.provider.provider_name(), zones.len());

        let zone = select_zone(&zones, hostname)
            .cloned()
            .ok_or_else(|| ReconcileError::ZoneNotFound {
                hostname: hostname.to_string(),
            })?;

        info!("Found zone {} ({}) for hostname {}", zone.id, zone.name, hostname);
        self.emit_event(ReconcileEvent::ZoneResolved {
            hostname: hostname.to_string(),
            zone_id: zone.id.clone(),
            zone_name: zone.name.clone(),
        });

        Ok(zone)
    }

    /// Find the A record set for `hostname` in `zone`
    ///
    /// The complete listing is consumed before concluding "not found".
    pub async fn find_address_record(
        &self,
        zone: &Zone,
        hostname: &Hostname,
    ) -> Result<Option<RecordSet>, ReconcileError> {
        let sets = self
            .bounded(Stage::ListRecordSets, self.provider.list_record_sets(&zone.id))
            .await?;
        debug!("Zone {} holds {} record set(s)", zone.id, sets.len());

        let found = select_address_record(sets, hostname);
        match &found {
            Some(set) => {
                info!(
                    "Current DNS IP: {} (TTL: {})",
                    set.first_value().unwrap_or("<none>"),
                    set.ttl.map(|t| t.to_string()).unwrap_or_else(|| "<none>".to_string())
                );
                self.emit_event(ReconcileEvent::RecordObserved {
                    hostname: hostname.to_string(),
                    ttl: set.ttl,
                    values: set.values.clone(),
                });
            }
            None => info!("Hostname {} not found in zone {}", hostname, zone.id),
        }

        Ok(found)
    }

    /// Bring the record to `address`, given what the lookup returned
    pub async fn apply(
        &self,
        zone: &Zone,
        hostname: &Hostname,
        address: &str,
        existing: Option<&RecordSet>,
    ) -> Result<Outcome, ReconcileError> {
        if let Some(reason) = existing.and_then(malformed_reason) {
            warn!("Ignoring malformed A record for {}: {}", hostname, reason);
            self.emit_event(ReconcileEvent::MalformedRecordIgnored {
                hostname: hostname.to_string(),
                reason: reason.to_string(),
            });
        }

        let state = classify(existing, address);
        debug!("Record state for {}: {:?}", hostname, state);

        match plan(&state, hostname, address, self.ttl) {
            Plan::Nothing => {
                info!("IPs match, not making any changes in DNS");
                Ok(Outcome::Unchanged {
                    hostname: hostname.to_string(),
                    address: address.to_string(),
                })
            }
            Plan::Create(create) => {
                info!("Adding {} to DNS as {}", hostname, address);
                self.submit(zone, hostname, vec![create]).await?;
                Ok(Outcome::Created {
                    hostname: hostname.to_string(),
                    address: address.to_string(),
                })
            }
            Plan::Replace {
                delete,
                create,
                previous,
            } => {
                if self.replace_atomically() {
                    info!("Replacing {} -> {} (was {}) in one batch", hostname, address, previous);
                    self.submit(zone, hostname, vec![delete, create]).await?;
                } else {
                    info!("Removing old record {} -> {}", hostname, previous);
                    self.submit(zone, hostname, vec![delete]).await?;

                    info!("Adding {} to DNS as {}", hostname, address);
                    if let Err(e) = self.submit(zone, hostname, vec![create]).await {
                        warn!(
                            "Old record for {} was removed but the new one was not created; \
                             the next run will create it",
                            hostname
                        );
                        return Err(e);
                    }
                }

                Ok(Outcome::Updated {
                    hostname: hostname.to_string(),
                    previous,
                    address: address.to_string(),
                })
            }
        }
    }

    fn replace_atomically(&self) -> bool {
        match self.replace_strategy {
            ReplaceStrategy::Sequential => false,
            ReplaceStrategy::Atomic if self.provider.supports_atomic_batches() => true,
            ReplaceStrategy::Atomic => {
                debug!(
                    "Provider {} does not apply batches atomically, replacing sequentially",
                    self.provider.provider_name()
                );
                false
            }
        }
    }

    async fn submit(
        &self,
        zone: &Zone,
        hostname: &Hostname,
        changes: Vec<Change>,
    ) -> Result<String, ReconcileError> {
        let actions: Vec<ChangeAction> = changes.iter().map(|c| c.action).collect();
        let batch = ChangeBatch::new(changes).with_comment(format!(
            "bootdns {} at {}",
            hostname,
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        ));

        let change_id = self
            .bounded(Stage::SubmitChange, self.provider.submit_change(&zone.id, &batch))
            .await?;
        debug!("Change {} accepted ({:?})", change_id, actions);

        self.emit_event(ReconcileEvent::ChangeSubmitted {
            zone_id: zone.id.clone(),
            change_id: change_id.clone(),
            actions,
        });

        Ok(change_id)
    }

    /// Await a provider call, bounded by the request timeout
    async fn bounded<T, F>(&self, stage: Stage, call: F) -> Result<T, ReconcileError>
    where
        F: Future<Output = crate::Result<T>>,
    {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ReconcileError::provider(stage, e)),
            Err(_) => Err(ReconcileError::provider(
                stage,
                Error::Timeout(self.request_timeout),
            )),
        }
    }

    /// Emit a reconcile event
    fn emit_event(&self, event: ReconcileEvent) {
        let Some(tx) = &self.event_tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing the channel capacity.");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Event receiver dropped, discarding event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryProvider;

    #[test]
    fn test_outcome_flags() {
        let created = Outcome::Created {
            hostname: "host.example.com.".to_string(),
            address: "1.2.3.4".to_string(),
        };
        let skipped = Outcome::Skipped(SkipReason::NoMatchingZone {
            hostname: "host.example.com.".to_string(),
        });

        assert!(created.changed());
        assert!(!skipped.changed());
        assert!(skipped.is_skipped());
        assert_eq!(skipped.to_string(), "skipped: no hosted zone matches host.example.com.");
    }

    #[tokio::test]
    async fn test_empty_address_rejected_before_provider_calls() {
        let provider = MemoryProvider::new();
        provider.fail_next(crate::provider::FailurePoint::ListZones);
        let reconciler =
            Reconciler::new(Box::new(provider.clone()), &ReconcileConfig::default()).unwrap();

        let result = reconciler.reconcile("host.example.com", "  ").await;
        assert!(matches!(result, Err(ReconcileError::InvalidInput(_))));

        // The armed failure was never consumed
        assert!(provider.list_zones().await.is_err());
    }

    #[tokio::test]
    async fn test_events_report_each_step() {
        let provider = MemoryProvider::new();
        provider.add_zone(Zone::new("Z1", "example.com."));
        let (reconciler, mut rx) =
            Reconciler::new(Box::new(provider), &ReconcileConfig::default())
                .unwrap()
                .with_events(16);

        reconciler.reconcile("host.example.com", "1.2.3.4").await.unwrap();

        assert!(matches!(rx.recv().await, Some(ReconcileEvent::ZoneResolved { .. })));
        assert!(matches!(
            rx.recv().await,
            Some(ReconcileEvent::ChangeSubmitted { ref actions, .. }) if actions == &vec![ChangeAction::Create]
        ));
        assert!(matches!(
            rx.recv().await,
            Some(ReconcileEvent::Completed { outcome: Outcome::Created { .. }, .. })
        ));
    }

    #[tokio::test]
    async fn test_full_event_channel_drops_later_events() {
        let provider = MemoryProvider::new();
        provider.add_zone(Zone::new("Z1", "example.com."));
        let (reconciler, mut rx) =
            Reconciler::new(Box::new(provider), &ReconcileConfig::default())
                .unwrap()
                .with_events(1);

        let outcome = reconciler.reconcile("host.example.com", "1.2.3.4").await.unwrap();

        assert!(matches!(outcome, Outcome::Created { .. }));
        assert!(matches!(rx.try_recv(), Ok(ReconcileEvent::ZoneResolved { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dropped_event_receiver_does_not_affect_reconcile() {
        let provider = MemoryProvider::new();
        provider.add_zone(Zone::new("Z1", "example.com."));
        let (reconciler, rx) =
            Reconciler::new(Box::new(provider.clone()), &ReconcileConfig::default())
                .unwrap()
                .with_events(16);
        drop(rx);

        let outcome = reconciler.reconcile("host.example.com", "1.2.3.4").await.unwrap();

        assert!(matches!(outcome, Outcome::Created { .. }));
        assert_eq!(provider.mutation_count(), 1);
    }
}
