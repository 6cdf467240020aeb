//! Diff between the observed record and the desired address
//!
//! ```text
//!   lookup ──► NoRecord ───────► CREATE                 ─► Created
//!          ├─► RecordMatches ──► (nothing)              ─► Unchanged
//!          └─► RecordStale ────► DELETE old, CREATE new ─► Updated
//! ```

use crate::hostname::Hostname;
use crate::reconciler::record::malformed_reason;
use crate::traits::{Change, RecordSet};

/// Observed state of the address record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordState {
    /// No usable record exists
    NoRecord,
    /// The record's first value is the desired address
    RecordMatches,
    /// The record points somewhere else
    RecordStale {
        /// The set as listed; deleting it requires its exact TTL and values
        existing: RecordSet,
    },
}

/// Classify a looked-up record against the desired address
///
/// Malformed sets (see [`malformed_reason`]) classify as
/// [`RecordState::NoRecord`].
pub fn classify(existing: Option<&RecordSet>, address: &str) -> RecordState {
    let Some(set) = existing else {
        return RecordState::NoRecord;
    };
    if malformed_reason(set).is_some() {
        return RecordState::NoRecord;
    }

    match set.first_value() {
        Some(current) if current.trim() == address => RecordState::RecordMatches,
        _ => RecordState::RecordStale {
            existing: set.clone(),
        },
    }
}

/// Provider changes implied by a [`RecordState`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Nothing to submit
    Nothing,
    /// Create the record
    Create(Change),
    /// Delete the stale record, then create the new one
    Replace {
        /// Removes the existing set
        delete: Change,
        /// Publishes the desired address
        create: Change,
        /// The address being replaced
        previous: String,
    },
}

/// Turn a state into the changes that reach the desired address
pub fn plan(state: &RecordState, hostname: &Hostname, address: &str, ttl: u32) -> Plan {
    let desired = || {
        Change::create(RecordSet::address(
            hostname.as_str(),
            ttl,
            vec![address.to_string()],
        ))
    };

    match state {
        RecordState::RecordMatches => Plan::Nothing,
        RecordState::NoRecord => Plan::Create(desired()),
        RecordState::RecordStale { existing } => Plan::Replace {
            delete: Change::delete(existing.clone()),
            create: desired(),
            previous: existing.first_value().unwrap_or_default().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ChangeAction;

    fn existing(values: &[&str]) -> RecordSet {
        RecordSet::address(
            "host.example.com.",
            300,
            values.iter().map(|v| v.to_string()).collect(),
        )
    }

    #[test]
    fn test_absent_record_is_no_record() {
        assert_eq!(classify(None, "1.2.3.4"), RecordState::NoRecord);
    }

    #[test]
    fn test_first_value_decides_match() {
        assert_eq!(
            classify(Some(&existing(&["1.2.3.4", "9.9.9.9"])), "1.2.3.4"),
            RecordState::RecordMatches
        );
        assert!(matches!(
            classify(Some(&existing(&["9.9.9.9", "1.2.3.4"])), "1.2.3.4"),
            RecordState::RecordStale { .. }
        ));
    }

    #[test]
    fn test_empty_record_is_treated_as_absent() {
        assert_eq!(classify(Some(&existing(&[])), "1.2.3.4"), RecordState::NoRecord);
    }

    #[test]
    fn test_stale_plan_deletes_exact_set_and_creates_with_default_ttl() {
        let hostname = Hostname::parse("host.example.com").unwrap();
        let state = classify(Some(&existing(&["1.2.3.4"])), "5.6.7.8");

        let Plan::Replace {
            delete,
            create,
            previous,
        } = plan(&state, &hostname, "5.6.7.8", 60)
        else {
            panic!("expected a replace plan");
        };

        assert_eq!(previous, "1.2.3.4");
        assert_eq!(delete.action, ChangeAction::Delete);
        assert_eq!(delete.record_set.ttl, Some(300));
        assert_eq!(delete.record_set.values, vec!["1.2.3.4".to_string()]);
        assert_eq!(create.action, ChangeAction::Create);
        assert_eq!(create.record_set.name, "host.example.com.");
        assert_eq!(create.record_set.ttl, Some(60));
        assert_eq!(create.record_set.values, vec!["5.6.7.8".to_string()]);
    }

    #[test]
    fn test_matching_plan_is_empty() {
        let hostname = Hostname::parse("host.example.com").unwrap();
        assert_eq!(
            plan(&RecordState::RecordMatches, &hostname, "1.2.3.4", 60),
            Plan::Nothing
        );
    }
}
