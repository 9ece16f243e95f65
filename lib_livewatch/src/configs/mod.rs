//! # Configuration Modules
//!
//! Loading of the creator roster, the one piece of configuration the library
//! itself needs. Process settings (ports, credentials, timeouts) belong to the
//! binaries.

/// Reads and validates the roster file.
pub mod roster;

pub use roster::{load_roster, parse_roster, RosterError};
