//! Address record selection

use crate::hostname::Hostname;
use crate::traits::{RecordSet, RecordType};

/// First A record set named `hostname` in a complete zone listing
pub fn select_address_record(sets: Vec<RecordSet>, hostname: &Hostname) -> Option<RecordSet> {
    sets.into_iter()
        .find(|set| set.record_type == RecordType::A && hostname.matches(&set.name))
}

/// Why a record set cannot be interpreted, if it cannot
///
/// A set without values has no current address; a set without a TTL cannot
/// be deleted by value. Either way it is treated as absent.
pub fn malformed_reason(set: &RecordSet) -> Option<&'static str> {
    if set.values.is_empty() {
        Some("record set has no values")
    } else if set.ttl.is_none() {
        Some("record set has no TTL")
    } else {
        None
    }
}
