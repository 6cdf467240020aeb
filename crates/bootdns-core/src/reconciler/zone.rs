//! Hosted zone selection

use std::cmp::Ordering;

use crate::hostname::{Hostname, absolute};
use crate::traits::Zone;

/// Pick the zone a hostname belongs to
///
/// Candidates are zones whose name is a label-boundary suffix of the
/// hostname. The most specific (longest) name wins. Equal names happen when
/// a public and a private zone share a name; the public one is preferred,
/// then the smallest id, so the choice never depends on listing order.
pub fn select_zone<'a>(zones: &'a [Zone], hostname: &Hostname) -> Option<&'a Zone> {
    zones
        .iter()
        .filter(|zone| hostname.is_within(&zone.name))
        .min_by(|a, b| most_specific_first(a, b))
}

fn most_specific_first(a: &Zone, b: &Zone) -> Ordering {
    let len = |zone: &Zone| absolute(&zone.name).len();

    len(b)
        .cmp(&len(a))
        .then_with(|| a.private.cmp(&b.private))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(name: &str) -> Hostname {
        Hostname::parse(name).unwrap()
    }

    #[test]
    fn test_longest_suffix_wins_regardless_of_order() {
        let zones = vec![
            Zone::new("Z1", "example.com."),
            Zone::new("Z2", "sub.example.com."),
        ];
        let reversed: Vec<Zone> = zones.iter().rev().cloned().collect();
        let hostname = host("host.sub.example.com.");

        assert_eq!(select_zone(&zones, &hostname).unwrap().name, "sub.example.com.");
        assert_eq!(select_zone(&reversed, &hostname).unwrap().name, "sub.example.com.");
    }

    #[test]
    fn test_no_match_returns_none() {
        let zones = vec![Zone::new("Z1", "example.org.")];
        assert!(select_zone(&zones, &host("host.example.com")).is_none());
        assert!(select_zone(&[], &host("host.example.com")).is_none());
    }

    #[test]
    fn test_substring_is_not_a_suffix_match() {
        let zones = vec![Zone::new("Z1", "ample.com.")];
        assert!(select_zone(&zones, &host("host.example.com")).is_none());
    }

    #[test]
    fn test_public_zone_preferred_over_private_twin() {
        let zones = vec![
            Zone::new("ZPRIV", "example.com.").with_private(true),
            Zone::new("ZPUB", "example.com."),
        ];
        assert_eq!(select_zone(&zones, &host("host.example.com")).unwrap().id, "ZPUB");
    }

    #[test]
    fn test_identical_zones_break_ties_by_id() {
        let zones = vec![Zone::new("ZB", "example.com."), Zone::new("ZA", "example.com.")];
        assert_eq!(select_zone(&zones, &host("host.example.com")).unwrap().id, "ZA");
    }

    #[test]
    fn test_apex_hostname_matches_its_zone() {
        let zones = vec![Zone::new("Z1", "example.com.")];
        assert_eq!(select_zone(&zones, &host("example.com")).unwrap().id, "Z1");
    }
}
