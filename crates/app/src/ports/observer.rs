//! Observer port — receives every connection snapshot, in order.

use volv0x_domain::connection::ConnectionState;

/// Receives each new [`ConnectionState`] synchronously, from inside the
/// event handling that produced it.
///
/// Implementations must not block: hand the snapshot off (channel, cheap
/// copy) and return.
pub trait StateObserver: Send + Sync {
    fn on_state_change(&self, state: &ConnectionState);
}

impl<F> StateObserver for F
where
    F: Fn(&ConnectionState) + Send + Sync,
{
    fn on_state_change(&self, state: &ConnectionState) {
        self(state);
    }
}
