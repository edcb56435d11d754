//! Telemetry module
//!
//! Logging is constructed using the [tracing](https://crates.io/crates/tracing) crate.
//! Use [crate::telemetry::init] to install the global logger, passing in a
//! boolean `verbose` parameter. This function will return an error if a logger
//! has already been initialized.
//!
//! Modules log under their own targets: `l1`, `engine` and `derive`.

pub mod logging;
pub use logging::{default_filter, get_subscriber, init, init_subscriber, AnsiTermLayer, AnsiVisitor};
