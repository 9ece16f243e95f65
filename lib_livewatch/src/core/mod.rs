//! # Core Engine Module
//!
//! The status-aggregation pipeline.
//!
//! - **`aggregator`**: runs both adapters for every roster entry concurrently
//!   and folds the answers into an ordered [`Snapshot`](crate::models::Snapshot).
//! - **`scheduler`**: serialises cycles. At most one runs at a time; triggers
//!   that arrive meanwhile collapse into a single follow-up.
//! - **`dispatcher`**: zero-copy fan-out of finished snapshots to connected clients.
//! - **`status_cycle`**: the job the scheduler runs (aggregate, then publish).

/// Concurrent fan-out/fan-in over the roster.
pub mod aggregator;
/// Broadcast sink for finished snapshots.
pub mod dispatcher;
/// One-at-a-time cycle scheduling with coalescing.
pub mod scheduler;
/// Aggregate-then-publish job.
pub mod status_cycle;

pub use aggregator::Aggregator;
pub use dispatcher::{Dispatcher, SnapshotSink, StatusFrame};
pub use scheduler::{CycleJob, Scheduler, SchedulerState, TriggerOutcome};
pub use status_cycle::StatusCycle;
