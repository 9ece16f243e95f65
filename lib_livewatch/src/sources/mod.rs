//! # Live-Status Sources
//!
//! Each adapter turns one creator identifier into a [`SourceResult`]. All
//! platform quirks (auth headers, retries, markup heuristics) stay behind the
//! [`LiveSource`] trait, so the aggregator never sees them.
//!
//! ## Contained Modules:
//! - **`twitch`**: Helix API lookups with bounded retries.
//! - **`youtube`**: video feed discovery plus a best-effort live-page check.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::SourceResult;
use crate::retrieve::HttpError;

/// Twitch Helix adapter.
pub mod twitch;
/// YouTube feed + live page adapter.
pub mod youtube;

pub use twitch::{TwitchConfig, TwitchSource};
pub use youtube::{YoutubeConfig, YoutubeSource};

/// Why a lookup could not be completed.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network, timeout or status failure after any retries.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The platform has no account under this identifier.
    #[error("no user found for login '{0}'")]
    UserNotFound(String),
}

/// Capability shared by the platform adapters.
#[async_trait]
pub trait LiveSource: Send + Sync {
    /// Short platform label for logs.
    fn platform(&self) -> &'static str;

    /// Looks up one identifier. Blank identifiers must resolve to
    /// [`SourceResult::invalid`] without touching the network.
    async fn lookup(&self, id: &str) -> Result<SourceResult, SourceError>;

    /// Like [`lookup`](Self::lookup) but folds failures into the neutral
    /// result after logging them.
    async fn resolve(&self, id: &str) -> SourceResult {
        match self.lookup(id).await {
            Ok(result) => result,
            Err(e @ SourceError::UserNotFound(_)) => {
                warn!(platform = self.platform(), id, error = %e, "lookup skipped");
                SourceResult::invalid()
            }
            Err(e) => {
                error!(platform = self.platform(), id, error = %e, "lookup failed");
                SourceResult::invalid()
            }
        }
    }
}
