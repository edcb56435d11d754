/// A module to derive payload attributes from L1 receipts.
pub mod attributes;
pub use attributes::{derive_attributes, DeriveError, DerivedAttributes, TRANSACTION_DEPOSITED_TOPIC};

/// A module to build execution payloads through the engine.
pub mod execution;
pub use execution::{
    build_payload, build_payload_with_retry, default_retry_policy, BuildError,
};

/// A module to invert L2 blocks back into their L1 inputs.
pub mod invert;
pub use invert::{invert_block, invert_payload, InvertedBlock};
