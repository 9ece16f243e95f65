//! # Cycle Scheduler
//!
//! Serializes poll cycles and coalesces the triggers that arrive while one is
//! in flight.
//!
//! ```text
//!   Idle --trigger--> Running --trigger--> RunningWithPending --trigger--> (same)
//!    ^                  |                        |
//!    +----cycle done----+     cycle done: run once more, back to Running
//! ```
//!
//! At most one cycle runs at a time, and any number of triggers received during
//! a cycle produce exactly one follow-up cycle.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, error};

/// Where the scheduler is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No cycle is running.
    Idle,
    /// A cycle is running and nothing is queued behind it.
    Running,
    /// A cycle is running and one more has been requested.
    RunningWithPending,
}

/// What a call to [`Scheduler::trigger`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The scheduler was idle and a cycle started.
    Started,
    /// A cycle was running; a follow-up is now queued.
    Queued,
    /// A follow-up was already queued; this trigger merged into it.
    Coalesced,
}

/// The unit of work the scheduler serializes.
#[async_trait]
pub trait CycleJob: Send + Sync + 'static {
    /// Runs one full cycle.
    async fn run_cycle(&self);
}

struct Inner {
    job: Arc<dyn CycleJob>,
    state: watch::Sender<SchedulerState>,
}

/// Cheap to clone; all clones drive the same state machine.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    /// An idle scheduler for `job`.
    pub fn new(job: Arc<dyn CycleJob>) -> Self {
        Self {
            inner: Arc::new(Inner {
                job,
                state: watch::Sender::new(SchedulerState::Idle),
            }),
        }
    }

    /// Requests a cycle. Never blocks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn trigger(&self) -> TriggerOutcome {
        let mut outcome = TriggerOutcome::Coalesced;
        self.inner.state.send_if_modified(|state| match *state {
            SchedulerState::Idle => {
                *state = SchedulerState::Running;
                outcome = TriggerOutcome::Started;
                true
            }
            SchedulerState::Running => {
                *state = SchedulerState::RunningWithPending;
                outcome = TriggerOutcome::Queued;
                true
            }
            SchedulerState::RunningWithPending => false,
        });

        debug!(?outcome, "cycle trigger");
        if outcome == TriggerOutcome::Started {
            tokio::spawn(drive(Arc::clone(&self.inner)));
        }
        outcome
    }

    /// Current state, for logs and tests.
    pub fn state(&self) -> SchedulerState {
        *self.inner.state.borrow()
    }

    /// Resolves once no cycle is running or queued.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.state.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|state| *state == SchedulerState::Idle).await;
    }
}

async fn drive(inner: Arc<Inner>) {
    loop {
        let job = Arc::clone(&inner.job);
        // Own task per cycle: a panic surfaces as a JoinError instead of
        // leaving the state stuck in Running.
        if let Err(err) = tokio::spawn(async move { job.run_cycle().await }).await {
            error!(error = %err, "poll cycle aborted; no snapshot for this cycle");
        }

        let mut again = false;
        inner.state.send_if_modified(|state| {
            if *state == SchedulerState::RunningWithPending {
                *state = SchedulerState::Running;
                again = true;
            } else {
                *state = SchedulerState::Idle;
            }
            true
        });
        if !again {
            break;
        }
    }
}
