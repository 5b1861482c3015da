//! Transport events — completions and unsolicited updates delivered by the
//! BLE stack.
//!
//! The transport guarantees that events for one handle are delivered one at
//! a time and in order; the router relies on that and adds no locking.

use std::sync::Arc;

use crate::connection::ConnectionPhase;
use crate::gatt::{GattStatus, ServiceDescriptor};
use crate::id::HandleId;

/// An asynchronous event reported by the transport for a given handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The link came up or went down. A non-success status on
    /// `Disconnected` means the link was lost rather than closed.
    ConnectionStateChanged {
        handle: HandleId,
        status: GattStatus,
        /// New phase of the link.
        phase: ConnectionPhase,
    },
    /// An MTU request completed.
    MtuChanged {
        handle: HandleId,
        /// MTU in effect after the exchange.
        mtu: u16,
        status: GattStatus,
    },
    /// Service discovery completed.
    ServicesDiscovered {
        handle: HandleId,
        /// Full service table; empty when discovery failed.
        services: Arc<[ServiceDescriptor]>,
        status: GattStatus,
    },
    /// A characteristic write was acknowledged (or failed).
    CharacteristicWrite {
        handle: HandleId,
        /// UUID of the written characteristic.
        characteristic: uuid::Uuid,
        status: GattStatus,
    },
    /// A characteristic read completed.
    CharacteristicRead {
        handle: HandleId,
        /// UUID of the read characteristic.
        characteristic: uuid::Uuid,
        /// Bytes read; empty when the read failed.
        value: Vec<u8>,
        status: GattStatus,
    },
    /// Notification pushed by the peripheral.
    CharacteristicChanged {
        handle: HandleId,
        /// UUID of the notifying characteristic.
        characteristic: uuid::Uuid,
        /// Raw notified value.
        value: Vec<u8>,
    },
}

impl TransportEvent {
    /// The handle this event originates from.
    #[must_use]
    pub fn handle(&self) -> HandleId {
        match self {
            Self::ConnectionStateChanged { handle, .. }
            | Self::MtuChanged { handle, .. }
            | Self::ServicesDiscovered { handle, .. }
            | Self::CharacteristicWrite { handle, .. }
            | Self::CharacteristicRead { handle, .. }
            | Self::CharacteristicChanged { handle, .. } => *handle,
        }
    }

    /// Completion status, for events that carry one.
    #[must_use]
    pub fn status(&self) -> Option<GattStatus> {
        match self {
            Self::ConnectionStateChanged { status, .. }
            | Self::MtuChanged { status, .. }
            | Self::ServicesDiscovered { status, .. }
            | Self::CharacteristicWrite { status, .. }
            | Self::CharacteristicRead { status, .. } => Some(*status),
            Self::CharacteristicChanged { .. } => None,
        }
    }

    /// Short name used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionStateChanged { .. } => "connection_state_changed",
            Self::MtuChanged { .. } => "mtu_changed",
            Self::ServicesDiscovered { .. } => "services_discovered",
            Self::CharacteristicWrite { .. } => "characteristic_write",
            Self::CharacteristicRead { .. } => "characteristic_read",
            Self::CharacteristicChanged { .. } => "characteristic_changed",
        }
    }
}
