//! Hostname normalization
//!
//! Provider record names are always zone-absolute, so every hostname is
//! dot-terminated before it is compared against anything.

use std::fmt;

use crate::error::{Error, Result};

/// A dot-terminated, fully-qualified hostname
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hostname(String);

impl Hostname {
    /// Normalize a caller-supplied hostname
    ///
    /// Surrounding whitespace is trimmed and a trailing "." appended when
    /// missing. The only rejected input is an empty name.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "." {
            return Err(Error::invalid_input("hostname cannot be empty"));
        }

        Ok(Self(absolute(trimmed)))
    }

    /// The normalized name, always ending in "."
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a provider-side name refers to this host
    pub fn matches(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(&absolute(name))
    }

    /// Whether this host lives inside `zone_name`
    ///
    /// The zone must match on a label boundary: `host.example.com.` is in
    /// `example.com.` but not in `ample.com.`. A zone apex is inside itself.
    pub fn is_within(&self, zone_name: &str) -> bool {
        let zone = absolute(zone_name.trim()).to_ascii_lowercase();
        if zone == "." {
            return true;
        }

        let host = self.0.to_ascii_lowercase();
        if host == zone {
            return true;
        }

        host.strip_suffix(&zone)
            .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Hostname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Append the root label if a name lacks it
pub(crate) fn absolute(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_dot_is_added_once() {
        assert_eq!(Hostname::parse("host.example.com").unwrap().as_str(), "host.example.com.");
        assert_eq!(Hostname::parse("host.example.com.").unwrap().as_str(), "host.example.com.");
        assert_eq!(Hostname::parse("  web1.example.org \n").unwrap().as_str(), "web1.example.org.");
    }

    #[test]
    fn test_empty_hostname_rejected() {
        assert!(Hostname::parse("").is_err());
        assert!(Hostname::parse("   ").is_err());
        assert!(Hostname::parse(".").is_err());
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let host = Hostname::parse("Web1.Example.com").unwrap();
        assert!(host.matches("web1.example.com."));
        assert!(host.matches("web1.example.com"));
        assert!(!host.matches("web2.example.com."));
    }

    #[test]
    fn test_zone_membership_respects_label_boundaries() {
        let host = Hostname::parse("host.example.com").unwrap();
        assert!(host.is_within("example.com."));
        assert!(host.is_within("com."));
        assert!(host.is_within("host.example.com."));
        assert!(!host.is_within("ample.com."));
        assert!(!host.is_within("other.com."));
        assert!(!host.is_within("sub.host.example.com."));
    }
}
