//! Instance user-data parsing
//!
//! User-data carries launch-time settings as `key=value` pairs joined by `|`,
//! e.g. `hostname=web1.example.com|role=frontend`.

use std::collections::HashMap;

/// Separator between user-data entries
pub const ENTRY_SEPARATOR: char = '|';

/// Parsed instance user-data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserData {
    entries: HashMap<String, String>,
}

impl UserData {
    /// Parse `key=value|key=value` text
    ///
    /// Keys and values are trimmed. Entries without `=` or with an empty key
    /// are ignored; a repeated key keeps its last value.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .split(ENTRY_SEPARATOR)
            .filter_map(|entry| entry.split_once('='))
            .map(|(key, value)| (key.trim(), value.trim()))
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Self { entries }
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// The `hostname` entry, when present and non-empty
    pub fn hostname(&self) -> Option<&str> {
        self.get("hostname").filter(|h| !h.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let data = UserData::parse("hostname=web1.example.com|role=frontend");
        assert_eq!(data.hostname(), Some("web1.example.com"));
        assert_eq!(data.get("role"), Some("frontend"));
        assert_eq!(data.get("missing"), None);
    }

    #[test]
    fn test_parse_trims_and_skips_junk() {
        let data = UserData::parse(" hostname = web1.example.com \n| garbage |=orphan| a=b=c");
        assert_eq!(data.hostname(), Some("web1.example.com"));
        assert_eq!(data.get("a"), Some("b=c"));
        assert_eq!(data.get(""), None);
    }

    #[test]
    fn test_empty_hostname_is_absent() {
        let data = UserData::parse("hostname=|role=db");
        assert_eq!(data.hostname(), None);
        assert!(!data.is_empty());
    }

    #[test]
    fn test_non_kv_user_data() {
        // A cloud-init script is not key/value data
        let data = UserData::parse("#!/bin/bash\necho hello\n");
        assert!(data.is_empty());
    }
}
