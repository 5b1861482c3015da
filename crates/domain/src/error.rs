//! Error taxonomy shared across the workspace.
//!
//! None of these are fatal: the router records or drops them and keeps
//! processing events. Each layer defines its own typed errors and converts
//! via `#[from]`.

use serde::{Deserialize, Serialize};

use crate::gatt::{GattOperation, GattStatus};
use crate::id::HandleId;

/// A transport command completed with a non-success status.
///
/// Recorded in [`ConnectionState::last_error`](crate::connection::ConnectionState::last_error)
/// so observers can see why the connection did not progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{operation} failed with GATT status {status}")]
pub struct TransportStatusError {
    /// Which operation reported the status.
    pub operation: GattOperation,
    /// The non-success status reported by the transport.
    pub status: GattStatus,
}

/// Why a telemetry payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// Fewer bytes than the fixed distance + battery header.
    #[error("payload must be at least {expected} bytes, got {actual}")]
    Malformed {
        /// Minimum byte count.
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },
}

/// Reasons the router rejects a transport event without producing a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GattError {
    /// The notification or read value could not be decoded.
    #[error("malformed telemetry payload")]
    MalformedPayload(#[from] PayloadError),

    /// The event references a handle that is no longer registered.
    #[error("event from stale handle {handle}")]
    StaleHandle {
        /// Handle carried by the discarded event.
        handle: HandleId,
    },

    /// A value arrived for a characteristic the router does not track.
    #[error("value for untracked characteristic {characteristic}")]
    UntrackedCharacteristic {
        /// Characteristic UUID carried by the discarded event.
        characteristic: uuid::Uuid,
    },
}
