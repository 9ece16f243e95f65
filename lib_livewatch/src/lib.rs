//! # lib_livewatch
//!
//! Polls Twitch and YouTube for a fixed roster of creators and folds the
//! answers into one ordered status snapshot per cycle.
//!
//! Modules are gated by Cargo features so that small tools can pull in only
//! the parts they need (`configs`, `loggers`, `retrieve`, `sources`, `core`).

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Plain data types shared by every layer.
pub mod models;

/// Roster file loading.
#[cfg(feature = "configs")]
pub mod configs;
/// Tracing subscriber setup.
#[cfg(feature = "loggers")]
pub mod loggers;
/// HTTP client with bounded retries.
#[cfg(feature = "retrieve")]
pub mod retrieve;
/// Per-platform live-status adapters.
#[cfg(feature = "sources")]
pub mod sources;
/// Aggregation, scheduling and fan-out.
#[cfg(feature = "core")]
pub mod core;

pub use models::{CreatorSnapshot, RosterEntry, Snapshot, SourceResult};
