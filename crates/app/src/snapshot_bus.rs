//! In-process snapshot bus backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use volv0x_domain::connection::ConnectionState;

use crate::ports::StateObserver;

/// Fans connection snapshots out to any number of async consumers using a
/// tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the snapshot is simply dropped).
#[derive(Debug, Clone)]
pub struct SnapshotBus {
    sender: broadcast::Sender<ConnectionState>,
}

impl SnapshotBus {
    /// Create a new bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to snapshots on this bus.
    ///
    /// Returns a receiver that will get all snapshots published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionState> {
        self.sender.subscribe()
    }
}

impl StateObserver for SnapshotBus {
    fn on_state_change(&self, state: &ConnectionState) {
        // broadcast::send fails only when there are zero receivers,
        // which is fine; the error is ignored.
        let _ = self.sender.send(state.clone());
    }
}
