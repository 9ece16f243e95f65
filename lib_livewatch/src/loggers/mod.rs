//! # Logging
//!
//! Installs the process-wide `tracing` subscriber used by the servers.

/// Console + rolling JSON file subscriber.
pub mod tracing_setup;

pub use tracing_setup::setup_logging;
