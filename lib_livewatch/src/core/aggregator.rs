//! # Aggregator
//!
//! One cycle = both adapters for every roster entry, all in flight at once
//! (optionally capped), merged back in roster order.
//!
//! Failures are isolated twice over. Each adapter call is captured on its own
//! (an error or a panic turns into that source's neutral result, the other
//! source is unaffected), and each entry as a whole is guarded so a panic in
//! the merge still yields a neutral record. A cycle therefore always returns
//! exactly one record per roster entry.

use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use futures_util::FutureExt;
use tracing::error;

use crate::models::{CreatorSnapshot, RosterEntry, Snapshot, SourceResult};
use crate::sources::LiveSource;

/// Runs aggregation cycles over a roster.
#[derive(Clone)]
pub struct Aggregator {
    twitch: Arc<dyn LiveSource>,
    youtube: Arc<dyn LiveSource>,
    max_concurrency: Option<NonZeroUsize>,
}

impl Aggregator {
    /// All roster entries are processed at once.
    pub fn new(twitch: Arc<dyn LiveSource>, youtube: Arc<dyn LiveSource>) -> Self {
        Self {
            twitch,
            youtube,
            max_concurrency: None,
        }
    }

    /// Caps how many roster entries are in flight together. Each entry still
    /// runs its two adapters concurrently.
    pub fn with_max_concurrency(mut self, limit: Option<NonZeroUsize>) -> Self {
        self.max_concurrency = limit;
        self
    }

    /// Looks up every entry and returns the snapshot in roster order,
    /// whatever order the network calls complete in.
    pub async fn run_cycle(&self, roster: &[RosterEntry]) -> Snapshot {
        let limit = self
            .max_concurrency
            .map_or(roster.len(), NonZeroUsize::get)
            .max(1);

        // Futures are lazy: nothing starts until `buffered` polls it, at most
        // `limit` at a time, yielding in input order.
        let pending: Vec<_> = roster.iter().map(|entry| self.process_entry(entry)).collect();
        stream::iter(pending).buffered(limit).collect().await
    }

    async fn process_entry(&self, entry: &RosterEntry) -> CreatorSnapshot {
        let work = async {
            let (twitch, youtube) = tokio::join!(
                capture(self.twitch.as_ref(), &entry.twitch_id, &entry.name),
                capture(self.youtube.as_ref(), &entry.youtube_id, &entry.name),
            );
            CreatorSnapshot::merge(entry, &twitch, &youtube)
        };

        match AssertUnwindSafe(work).catch_unwind().await {
            Ok(snapshot) => snapshot,
            Err(_) => {
                error!(creator = %entry.name, "entry processing panicked, emitting neutral status");
                CreatorSnapshot::neutral(entry)
            }
        }
    }
}

/// Runs one adapter call, turning errors and panics into the neutral result.
async fn capture(source: &dyn LiveSource, id: &str, creator: &str) -> SourceResult {
    match AssertUnwindSafe(source.resolve(id)).catch_unwind().await {
        Ok(result) => result,
        Err(_) => {
            error!(platform = source.platform(), creator, "lookup panicked");
            SourceResult::invalid()
        }
    }
}
