//! Connection snapshot — the consumer-facing view of one peripheral link.
//!
//! A [`ConnectionState`] is never mutated in place by the router: every
//! accepted transport event produces a new value (see
//! `volv0x_app::router::fold`). Cloning is cheap because the discovered
//! services are shared behind an `Arc`.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::alert::{self, AlertTier, OUT_OF_RANGE_MILLIMETERS};
use crate::error::TransportStatusError;
use crate::gatt::{CharacteristicDescriptor, GattTarget, ServiceDescriptor};
use crate::id::HandleId;
use crate::payload::SensorReading;
use crate::time::{Timestamp, now};

/// MTU value meaning "not negotiated yet".
pub const UNKNOWN_MTU: i32 = -1;

/// Link-layer phase of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPhase {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("Disconnected"),
            Self::Connecting => f.write_str("Connecting"),
            Self::Connected => f.write_str("Connected"),
            Self::Disconnecting => f.write_str("Disconnecting"),
        }
    }
}

/// Immutable snapshot of the connection to the selected peripheral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionState {
    /// Handle registered with the transport, if any.
    pub transport_handle: Option<HandleId>,
    /// Link-layer phase as last reported by the transport.
    pub phase: ConnectionPhase,
    /// Negotiated ATT MTU, or [`UNKNOWN_MTU`].
    pub negotiated_mtu: i32,
    /// Services found by the last successful discovery.
    pub services: Arc<[ServiceDescriptor]>,
    /// Set once the enable-notification write was issued on this connection.
    pub notification_armed: bool,
    /// Whether the last characteristic write completed successfully.
    pub last_write_acknowledged: bool,
    /// Latest telemetry sample, from a read or a notification.
    pub last_reading: Option<SensorReading>,
    /// Most recent non-success status reported by the transport.
    pub last_error: Option<TransportStatusError>,
    /// When this snapshot was produced.
    pub updated_at: Timestamp,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            transport_handle: None,
            phase: ConnectionPhase::Disconnected,
            negotiated_mtu: UNKNOWN_MTU,
            services: Arc::from(Vec::new()),
            notification_armed: false,
            last_write_acknowledged: false,
            last_reading: None,
            last_error: None,
            updated_at: now(),
        }
    }
}

impl ConnectionState {
    /// Initial snapshot: disconnected, no handle.
    #[must_use]
    pub fn initial() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.phase == ConnectionPhase::Connected
    }

    /// Whether `handle` is the handle currently registered.
    #[must_use]
    pub fn owns(&self, handle: HandleId) -> bool {
        self.transport_handle == Some(handle)
    }

    /// The target characteristic, once discovered.
    #[must_use]
    pub fn target_characteristic(&self, target: &GattTarget) -> Option<&CharacteristicDescriptor> {
        target.find(&self.services)
    }

    /// Distance used for alerting: the last reading, or out of range.
    #[must_use]
    pub fn effective_distance(&self) -> u16 {
        self.last_reading
            .map_or(OUT_OF_RANGE_MILLIMETERS, |r| r.distance_millimeters)
    }

    /// Alert tier of the last reading.
    #[must_use]
    pub fn alert_tier(&self) -> AlertTier {
        alert::classify(self.effective_distance())
    }

    /// Copy of `self` stamped with the current time, to be modified into
    /// the next snapshot.
    #[must_use]
    pub fn next(&self) -> Self {
        Self {
            updated_at: now(),
            ..self.clone()
        }
    }

    /// Drop everything that only holds for a live link.
    pub fn clear_link(&mut self) {
        self.services = Arc::from(Vec::new());
        self.notification_armed = false;
    }
}
