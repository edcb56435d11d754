//! ## L2 Engine API
//!
//! A set of methods that allow a consensus client to interact with an execution engine.
//! This is a modified version of the [Ethereum Execution API Specs](https://github.com/ethereum/execution-apis),
//! as defined in the [Optimism Exec Engine Specs](https://github.com/ethereum-optimism/optimism/blob/develop/specs/exec-engine.md).

/// Payload Types
mod payload;
pub use payload::*;

/// Forkchoice Types
mod fork;
pub use fork::*;

/// The Engine Driver
mod api;
pub use api::*;

/// Auth module
mod auth;
pub use auth::*;

/// Error types
mod errors;
pub use errors::*;

/// Common Types
mod params;
pub use params::*;

/// Core Trait
mod traits;
pub use traits::*;

/// Mock Engine
#[cfg(any(test, feature = "test-utils"))]
mod mock_engine;
#[cfg(any(test, feature = "test-utils"))]
pub use mock_engine::*;
