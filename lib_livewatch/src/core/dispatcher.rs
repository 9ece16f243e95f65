//! # Zero-Copy Snapshot Dispatcher
//!
//! Takes one finished snapshot and hands it to every connected client.
//!
//! The snapshot is wrapped once in an `Arc<StatusFrame>`; each client gets a
//! pointer to the same allocation. Clients whose receiver has been dropped are
//! pruned during the fan-out.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::models::Snapshot;

/// One broadcast unit: a cycle's snapshot plus its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusFrame {
    /// Monotonic cycle number, starting at 1.
    pub cycle: u64,
    /// When the cycle finished.
    pub emitted_at: DateTime<Utc>,
    /// One record per roster entry, in roster order.
    pub snapshot: Snapshot,
}

/// Receives every completed snapshot.
pub trait SnapshotSink: Send + Sync {
    /// Publishes the output of cycle `cycle`.
    fn publish(&self, cycle: u64, snapshot: Snapshot);
}

/// An internal representation of a connected client.
struct ClientHandle {
    id: String,
    sender: mpsc::UnboundedSender<Arc<StatusFrame>>,
}

/// Registration and fan-out of status frames.
#[derive(Default)]
pub struct Dispatcher {
    clients: Mutex<Vec<ClientHandle>>,
}

impl Dispatcher {
    /// An empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ClientHandle>> {
        // A panic while holding the lock cannot leave the Vec half-updated.
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a client and returns the receiving half of its queue.
    pub fn add_client(&self, id: &str) -> mpsc::UnboundedReceiver<Arc<StatusFrame>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(ClientHandle {
            id: id.to_string(),
            sender: tx,
        });
        info!("Client '{}' registered", id);
        rx
    }

    /// Removes a specific client by its ID.
    pub fn remove_client(&self, id: &str) {
        self.lock().retain(|c| c.id != id);
        info!("Client '{}' removed", id);
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> usize {
        self.lock().len()
    }

    /// Sends `frame` to every client, dropping the ones that went away.
    pub fn broadcast(&self, frame: StatusFrame) {
        let frame = Arc::new(frame);
        let mut clients = self.lock();
        clients.retain(|client| match client.sender.send(Arc::clone(&frame)) {
            Ok(()) => true,
            Err(_) => {
                info!("Client '{}' disconnected. Removing from dispatcher.", client.id);
                false
            }
        });
        debug!(cycle = frame.cycle, clients = clients.len(), "status frame dispatched");
    }
}

impl SnapshotSink for Dispatcher {
    fn publish(&self, cycle: u64, snapshot: Snapshot) {
        self.broadcast(StatusFrame {
            cycle,
            emitted_at: Utc::now(),
            snapshot,
        });
    }
}
