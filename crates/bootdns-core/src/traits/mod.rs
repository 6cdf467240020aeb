//! Core traits for bootdns
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DnsProvider`]: List zones and record sets, submit changes
//! - [`MetadataSource`]: Supply the hostname and address to publish

pub mod dns_provider;
pub mod metadata_source;

pub use dns_provider::{
    Change, ChangeAction, ChangeBatch, DnsProvider, DnsProviderFactory, RecordSet, RecordType,
    Zone,
};
pub use metadata_source::{MetadataSource, MetadataSourceFactory};
