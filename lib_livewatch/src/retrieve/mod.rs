//! # Data Retrieval Module
//!
//! Shared HTTP plumbing for the platform adapters. Request building, timeouts
//! and the retry policy live here so the adapters can stay focused on parsing.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: an `ApiClient` built on `reqwest` and `reqwest-middleware`,
//!   with an optional fixed-interval retry layer from `reqwest-retry`.

/// Generic HTTP API client with retry middleware.
pub mod ky_http;

pub use ky_http::{ApiClient, ClientOptions, HttpError, RetryConfig};
