// # DNS Provider Trait
//
// Defines the interface to a hosted-zone DNS provider.
//
// ## Implementations
//
// - Route 53: `bootdns-provider-route53` crate
// - In-memory: `bootdns_core::provider::MemoryProvider` (tests)
//
// ## Usage
//
// ```rust,ignore
// use bootdns_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     for zone in provider.list_zones().await? {
//         println!("{} {}", zone.id, zone.name);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A hosted zone as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Provider zone identifier (without any path prefix)
    pub id: String,
    /// Zone name, dot-terminated
    pub name: String,
    /// Whether the zone is only visible inside a private network
    #[serde(default)]
    pub private: bool,
}

impl Zone {
    /// Create a public zone
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: crate::hostname::absolute(&name.into()),
            private: false,
        }
    }

    /// Mark the zone as private
    pub fn with_private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }
}

/// DNS record type
///
/// Only [`RecordType::A`] is ever written; the other variants exist so
/// listings can be represented faithfully.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address
    A,
    /// IPv6 address
    Aaaa,
    /// Canonical name
    Cname,
    /// Anything else, kept verbatim
    Other(String),
}

impl RecordType {
    /// Wire name of the type
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Other(name) => name,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            other => RecordType::Other(other.to_string()),
        })
    }
}

/// A record set as listed by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Zone-absolute record name
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Time-to-live; alias-style sets have none
    pub ttl: Option<u32>,
    /// Record values, in provider order
    pub values: Vec<String>,
}

impl RecordSet {
    /// Create an address (A) record set
    pub fn address(name: impl Into<String>, ttl: u32, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            record_type: RecordType::A,
            ttl: Some(ttl),
            values,
        }
    }

    /// The value treated as "current" when a set holds several
    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

/// Change action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    /// Create a record set that does not exist yet
    Create,
    /// Delete a record set; name, type, TTL and values must match exactly
    Delete,
}

impl ChangeAction {
    /// Wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "CREATE",
            ChangeAction::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single record-set mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// What to do
    pub action: ChangeAction,
    /// The record set to create or delete
    pub record_set: RecordSet,
}

impl Change {
    /// Create a CREATE change
    pub fn create(record_set: RecordSet) -> Self {
        Self {
            action: ChangeAction::Create,
            record_set,
        }
    }

    /// Create a DELETE change
    pub fn delete(record_set: RecordSet) -> Self {
        Self {
            action: ChangeAction::Delete,
            record_set,
        }
    }
}

/// Changes submitted together
///
/// Providers that report [`DnsProvider::supports_atomic_batches`] apply a
/// batch all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChangeBatch {
    /// Free-form comment recorded by the provider
    pub comment: Option<String>,
    /// Changes, applied in order
    pub changes: Vec<Change>,
}

impl ChangeBatch {
    /// Create a batch from changes
    pub fn new(changes: Vec<Change>) -> Self {
        Self {
            comment: None,
            changes,
        }
    }

    /// Attach a comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Trait for hosted-zone DNS provider implementations
///
/// Providers are thin API clients: they list, they submit, they report
/// errors. They do not retry, cache, or decide whether a change is needed;
/// that is the reconciler's job.
///
/// Implementations must consume provider-side pagination themselves. A
/// listing that returns is a complete listing.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every hosted zone visible to the credentials
    async fn list_zones(&self) -> Result<Vec<Zone>, crate::Error>;

    /// List every record set in a zone
    ///
    /// # Parameters
    ///
    /// - `zone_id`: The zone identifier as returned by [`DnsProvider::list_zones`]
    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<RecordSet>, crate::Error>;

    /// Submit a change batch to a zone
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: A provider change identifier (for logging)
    /// - `Err(Error)`: If the batch was rejected or the call failed
    async fn submit_change(
        &self,
        zone_id: &str,
        batch: &ChangeBatch,
    ) -> Result<String, crate::Error>;

    /// Whether a multi-change batch is applied atomically
    fn supports_atomic_batches(&self) -> bool {
        false
    }

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_name_is_absolute() {
        assert_eq!(Zone::new("Z1", "example.com").name, "example.com.");
        assert_eq!(Zone::new("Z1", "example.com.").name, "example.com.");
    }

    #[test]
    fn test_record_type_parsing() {
        assert_eq!("a".parse::<RecordType>().unwrap(), RecordType::A);
        assert_eq!("AAAA".parse::<RecordType>().unwrap(), RecordType::Aaaa);
        assert_eq!(
            "TXT".parse::<RecordType>().unwrap(),
            RecordType::Other("TXT".to_string())
        );
        assert_eq!(RecordType::Other("MX".to_string()).to_string(), "MX");
    }

    #[test]
    fn test_first_value_is_current() {
        let set = RecordSet::address(
            "rr.example.com.",
            300,
            vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()],
        );
        assert_eq!(set.first_value(), Some("10.0.0.1"));

        let empty = RecordSet::address("rr.example.com.", 300, Vec::new());
        assert_eq!(empty.first_value(), None);
    }
}
