//! Derivation of the L2 chain from L1 blocks.
//!
//! Each L1 block passes through three stages:
//!
//! 1. [stages::attributes] turns the block header and its verified receipts
//!    into payload attributes. This stage is pure.
//! 2. [stages::execution] hands the attributes to the engine, which builds
//!    the payload on top of the current forkchoice head.
//! 3. [stages::invert] goes the other way and recovers from an L2 block the
//!    L1 data it must have been derived from. This stage is pure.
//!
//! [Pipeline] chains the L1 [Source](crate::l1::Source) with the first two
//! stages and applies the resulting payloads to the engine.

pub mod stages;
pub use stages::*;

pub mod pipeline;
pub use pipeline::{ApplyOutcome, Pipeline, PipelineError};
