//! Aggregate-then-publish: the job the scheduler runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::info;

use super::aggregator::Aggregator;
use super::dispatcher::SnapshotSink;
use super::scheduler::CycleJob;
use crate::models::RosterEntry;

/// Polls the whole roster and hands the snapshot to a sink.
pub struct StatusCycle {
    aggregator: Aggregator,
    roster: Arc<[RosterEntry]>,
    sink: Arc<dyn SnapshotSink>,
    cycles: AtomicU64,
}

impl StatusCycle {
    /// The roster is fixed for the lifetime of the job.
    pub fn new(aggregator: Aggregator, roster: Vec<RosterEntry>, sink: Arc<dyn SnapshotSink>) -> Self {
        Self {
            aggregator,
            roster: roster.into(),
            sink,
            cycles: AtomicU64::new(0),
        }
    }

    /// Number of cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CycleJob for StatusCycle {
    async fn run_cycle(&self) {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let started = Instant::now();

        let snapshot = self.aggregator.run_cycle(&self.roster).await;

        let live = snapshot
            .iter()
            .filter(|s| s.twitch_live || s.youtube_live)
            .count();
        info!(
            cycle,
            creators = snapshot.len(),
            live,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "poll cycle complete"
        );
        self.sink.publish(cycle, snapshot);
    }
}
