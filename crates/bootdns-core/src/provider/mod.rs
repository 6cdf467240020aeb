//! Built-in DNS provider implementations
//!
//! This module provides provider implementations that need no network:
//! - [`MemoryProvider`]: Hosted zones held in memory, with failure injection

pub mod memory;

pub use memory::{FailurePoint, MemoryProvider, SubmittedBatch};
