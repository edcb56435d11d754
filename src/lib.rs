/// Common types and functions
pub mod common;

/// A module for reading verified L1 chain data
pub mod l1;

/// Validated block references on both the L1 and L2 chains
pub mod sync;

/// A module for the L2 Engine API
pub mod engine;

/// The derivation pipeline module for deriving the canonical L2 chain
pub mod derive;

/// Alloy backed chain clients
pub mod providers;

/// Configuration management
pub mod config;

/// Application telemetry and logging
pub mod telemetry;

/// In-memory chain clients for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
