//! GATT event router — the connection state machine.
//!
//! The transition logic is the pure function [`fold`]: given the current
//! snapshot and one transport event it returns the next snapshot plus the
//! transport commands to issue. [`GattEventRouter`] is the thin shell around
//! it that owns the snapshot, notifies observers and dispatches commands.
//!
//! ```text
//! Disconnected --connect()------------------> Connecting
//! Connecting   --transport: Connected-------> Connected
//! Connected    --disconnect()---------------> Disconnecting
//! any          --transport: Disconnected----> Disconnected   (services + notification flag cleared)
//! Connected    --discover()-----------------> Connected      (services arrive as an event)
//! ```

mod command;

pub use command::Command;

use std::sync::Arc;

use volv0x_domain::connection::{ConnectionPhase, ConnectionState};
use volv0x_domain::error::{GattError, TransportStatusError};
use volv0x_domain::event::TransportEvent;
use volv0x_domain::gatt::{
    CharacteristicDescriptor, DEFAULT_ATT_MTU, DescriptorRef, ENABLE_NOTIFICATION_VALUE,
    GattOperation, GattStatus, GattTarget, MAX_ATT_MTU, WriteType,
};
use volv0x_domain::id::{HandleId, PeripheralId};
use volv0x_domain::payload::PayloadCodec;

use crate::ports::{StateObserver, Transport};

/// Demo payload sent by [`GattEventRouter::write_greeting`].
pub const GREETING: &[u8] = b"Hello Patch!";

/// Static inputs of the state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterConfig {
    /// Service + characteristic carrying the telemetry.
    pub target: GattTarget,
    pub codec: PayloadCodec,
}

/// Result of folding one event: the next snapshot and the commands it implies.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: ConnectionState,
    pub commands: Vec<Command>,
}

/// Fold one transport event into the current snapshot.
///
/// # Errors
///
/// Returns a [`GattError`] when the event must be dropped without producing
/// a snapshot: it comes from a handle that is not registered, carries a
/// value for another characteristic, or carries an undecodable payload.
/// Non-success statuses are not errors here; they are recorded in
/// [`ConnectionState::last_error`].
pub fn fold(
    state: &ConnectionState,
    event: &TransportEvent,
    config: &RouterConfig,
) -> Result<Transition, GattError> {
    let handle = event.handle();
    if !state.owns(handle) {
        return Err(GattError::StaleHandle { handle });
    }

    let mut next = state.next();
    let mut commands = Vec::new();

    match event {
        TransportEvent::ConnectionStateChanged { status, phase, .. } => {
            record_status(&mut next, GattOperation::Connect, *status);
            match phase {
                ConnectionPhase::Connected if state.phase != ConnectionPhase::Connected => {
                    next.clear_link();
                }
                ConnectionPhase::Disconnected => next.clear_link(),
                _ => {}
            }
            next.phase = *phase;
        }
        TransportEvent::MtuChanged { mtu, status, .. } => {
            if record_status(&mut next, GattOperation::RequestMtu, *status) {
                next.negotiated_mtu = i32::from(*mtu);
            }
        }
        TransportEvent::ServicesDiscovered {
            services, status, ..
        } => {
            if record_status(&mut next, GattOperation::DiscoverServices, *status) {
                next.services = Arc::clone(services);
                match config.target.find(&next.services) {
                    Some(characteristic) if !next.notification_armed => {
                        commands.push(Command::WriteDescriptor {
                            handle,
                            descriptor: DescriptorRef::cccd(characteristic),
                            value: ENABLE_NOTIFICATION_VALUE.to_vec(),
                        });
                        next.notification_armed = true;
                    }
                    Some(_) => {}
                    None => tracing::debug!(
                        service = %config.target.service,
                        characteristic = %config.target.characteristic,
                        "target characteristic not exposed by peripheral"
                    ),
                }
            }
        }
        TransportEvent::CharacteristicWrite { status, .. } => {
            let acknowledged =
                record_status(&mut next, GattOperation::WriteCharacteristic, *status);
            next.last_write_acknowledged = acknowledged;
        }
        TransportEvent::CharacteristicRead {
            characteristic,
            value,
            status,
            ..
        } => {
            ensure_tracked(*characteristic, config)?;
            if record_status(&mut next, GattOperation::ReadCharacteristic, *status) {
                next.last_reading = Some(config.codec.decode(value)?);
            }
        }
        TransportEvent::CharacteristicChanged {
            characteristic,
            value,
            ..
        } => {
            ensure_tracked(*characteristic, config)?;
            next.last_reading = Some(config.codec.decode(value)?);
        }
    }

    Ok(Transition {
        state: next,
        commands,
    })
}

/// Record a non-success status; returns whether the status was a success.
fn record_status(state: &mut ConnectionState, operation: GattOperation, status: GattStatus) -> bool {
    if status.is_success() {
        return true;
    }
    state.last_error = Some(TransportStatusError { operation, status });
    false
}

fn ensure_tracked(characteristic: uuid::Uuid, config: &RouterConfig) -> Result<(), GattError> {
    if characteristic == config.target.characteristic {
        Ok(())
    } else {
        Err(GattError::UntrackedCharacteristic { characteristic })
    }
}

/// Owns the current [`ConnectionState`] of one peripheral and applies
/// transport events and consumer requests to it.
///
/// Must be driven from a single task: events are assumed to arrive one at a
/// time (see [`Session`](crate::session::Session)).
pub struct GattEventRouter<T> {
    transport: T,
    peripheral: PeripheralId,
    config: RouterConfig,
    state: ConnectionState,
    observers: Vec<Box<dyn StateObserver>>,
}

impl<T: Transport> GattEventRouter<T> {
    /// Create a router for `peripheral`, starting from the initial snapshot.
    pub fn new(transport: T, peripheral: PeripheralId, config: RouterConfig) -> Self {
        Self {
            transport,
            peripheral,
            config,
            state: ConnectionState::initial(),
            observers: Vec::new(),
        }
    }

    /// Register an observer; it receives every snapshot produced from now on.
    pub fn subscribe(&mut self, observer: impl StateObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// The current snapshot.
    #[must_use]
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    #[must_use]
    pub fn peripheral(&self) -> &PeripheralId {
        &self.peripheral
    }

    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Apply one transport event.
    ///
    /// Rejected events are logged here and leave the snapshot untouched; the
    /// error is returned for inspection only.
    ///
    /// # Errors
    ///
    /// See [`fold`].
    pub fn handle_event(&mut self, event: &TransportEvent) -> Result<(), GattError> {
        match fold(&self.state, event, &self.config) {
            Ok(transition) => {
                if let Some(status) = event.status().filter(|s| !s.is_success()) {
                    tracing::warn!(
                        handle = %event.handle(),
                        event = event.kind(),
                        %status,
                        "transport reported failure"
                    );
                }
                self.apply(transition);
                Ok(())
            }
            Err(err) => {
                match &err {
                    GattError::MalformedPayload(_) => {
                        tracing::warn!(handle = %event.handle(), %err, "dropping telemetry value");
                    }
                    GattError::StaleHandle { .. } => {
                        tracing::debug!(event = event.kind(), %err, "discarding stale event");
                    }
                    GattError::UntrackedCharacteristic { .. } => {
                        tracing::trace!(%err, "ignoring value");
                    }
                }
                Err(err)
            }
        }
    }

    /// Open (or re-open) the link to the peripheral.
    ///
    /// Reuses the registered handle when there is one; otherwise a new
    /// handle is created and registered. Ignored while already connected
    /// or connecting.
    pub fn connect(&mut self) {
        if matches!(
            self.state.phase,
            ConnectionPhase::Connected | ConnectionPhase::Connecting
        ) {
            tracing::debug!(phase = %self.state.phase, "connect ignored");
            return;
        }

        let mut next = self.state.next();
        let mut commands = Vec::new();
        match self.state.transport_handle {
            Some(handle) => {
                tracing::info!(%handle, peripheral = %self.peripheral, "reconnecting");
                commands.push(Command::Reconnect { handle });
            }
            None => {
                let handle = self.transport.open(&self.peripheral);
                tracing::info!(%handle, peripheral = %self.peripheral, "opened transport handle");
                next.transport_handle = Some(handle);
            }
        }
        next.phase = ConnectionPhase::Connecting;
        self.apply(Transition {
            state: next,
            commands,
        });
    }

    /// Close the link, keeping the handle for a later [`connect`](Self::connect).
    pub fn disconnect(&mut self) {
        let Some(handle) = self.state.transport_handle else {
            tracing::debug!("disconnect ignored, no transport handle");
            return;
        };

        let mut next = self.state.next();
        if matches!(
            self.state.phase,
            ConnectionPhase::Connected | ConnectionPhase::Connecting
        ) {
            next.phase = ConnectionPhase::Disconnecting;
        }
        self.apply(Transition {
            state: next,
            commands: vec![Command::Close { handle }],
        });
    }

    /// Ask the transport to negotiate an MTU of `size` bytes (clamped to the
    /// ATT range). The outcome arrives as an MTU event.
    pub fn request_mtu(&mut self, size: u16) {
        let Some(handle) = self.state.transport_handle else {
            tracing::debug!("MTU request ignored, no transport handle");
            return;
        };
        let size = size.clamp(DEFAULT_ATT_MTU, MAX_ATT_MTU);
        tracing::debug!(%handle, size, "requesting MTU");
        self.dispatch(&[Command::RequestMtu { handle, size }]);
    }

    /// Start service discovery on the live connection.
    pub fn discover(&mut self) {
        let handle = match (self.state.transport_handle, self.state.phase) {
            (Some(handle), ConnectionPhase::Connected) => handle,
            (_, phase) => {
                tracing::debug!(%phase, "discovery ignored, not connected");
                return;
            }
        };
        self.dispatch(&[Command::DiscoverServices { handle }]);
    }

    /// Write the demo greeting to the target characteristic.
    pub fn write_greeting(&mut self) {
        let Some(command) = self.target_command(|handle, characteristic| {
            Command::WriteCharacteristic {
                handle,
                characteristic,
                value: GREETING.to_vec(),
                write_type: WriteType::WithResponse,
            }
        }) else {
            tracing::debug!("greeting ignored, target characteristic not discovered");
            return;
        };
        self.dispatch(&[command]);
    }

    /// Read the target characteristic; the value arrives as a read event.
    pub fn read_characteristic(&mut self) {
        let Some(command) = self.target_command(|handle, characteristic| {
            Command::ReadCharacteristic {
                handle,
                characteristic,
            }
        }) else {
            tracing::debug!("read ignored, target characteristic not discovered");
            return;
        };
        self.dispatch(&[command]);
    }

    /// Close and release the registered handle, then return to the initial
    /// snapshot. Returns whether a handle was released.
    pub(crate) fn release(&mut self) -> bool {
        let Some(handle) = self.state.transport_handle else {
            return false;
        };
        tracing::info!(%handle, peripheral = %self.peripheral, "releasing transport handle");
        self.apply(Transition {
            state: ConnectionState::initial(),
            commands: vec![Command::Close { handle }, Command::Release { handle }],
        });
        true
    }

    /// Replace the current snapshot, notify observers, then issue commands.
    pub(crate) fn apply(&mut self, transition: Transition) {
        self.state = transition.state;
        for observer in &self.observers {
            observer.on_state_change(&self.state);
        }
        self.dispatch(&transition.commands);
    }

    fn dispatch(&self, commands: &[Command]) {
        for command in commands {
            command.dispatch(&self.transport);
        }
    }

    fn target_command(
        &self,
        build: impl FnOnce(HandleId, CharacteristicDescriptor) -> Command,
    ) -> Option<Command> {
        let handle = self.state.transport_handle?;
        if !self.state.is_connected() {
            return None;
        }
        let characteristic = self.state.target_characteristic(&self.config.target)?;
        Some(build(handle, characteristic.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use volv0x_domain::alert::{AlertTier, classify};
    use volv0x_domain::connection::UNKNOWN_MTU;
    use volv0x_domain::error::PayloadError;
    use volv0x_domain::gatt::CCCD_UUID;
    use volv0x_domain::payload::SensorReading;

    use super::*;
    use crate::testing::{
        Call, RecordingTransport, connected, discovered, disconnected, notification, peripheral,
    };

    fn router() -> (GattEventRouter<RecordingTransport>, RecordingTransport) {
        let transport = RecordingTransport::default();
        let router = GattEventRouter::new(transport.clone(), peripheral(), RouterConfig::default());
        (router, transport)
    }

    fn connected_router() -> (GattEventRouter<RecordingTransport>, RecordingTransport, HandleId) {
        let (mut router, transport) = router();
        router.connect();
        let handle = transport.opened()[0];
        router.handle_event(&connected(handle)).unwrap();
        transport.clear();
        (router, transport, handle)
    }

    fn recorded_snapshots(
        router: &mut GattEventRouter<RecordingTransport>,
    ) -> Arc<Mutex<Vec<ConnectionState>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        router.subscribe(move |state: &ConnectionState| sink.lock().unwrap().push(state.clone()));
        seen
    }

    fn is_enable_notification(call: &Call) -> bool {
        matches!(call, Call::WriteDescriptor { descriptor, .. } if descriptor.uuid == CCCD_UUID)
    }

    // ── fold ────────────────────────────────────────────────────────────

    #[test]
    fn should_reject_event_from_unregistered_handle() {
        let state = ConnectionState::initial();
        let handle = HandleId::new();
        let result = fold(&state, &connected(handle), &RouterConfig::default());
        assert_eq!(result, Err(GattError::StaleHandle { handle }));
    }

    #[test]
    fn should_arm_notification_once_when_target_discovered() {
        let config = RouterConfig::default();
        let handle = HandleId::new();
        let state = ConnectionState {
            transport_handle: Some(handle),
            phase: ConnectionPhase::Connected,
            ..ConnectionState::initial()
        };

        let first = fold(&state, &discovered(handle, &config.target), &config).unwrap();
        assert!(first.state.notification_armed);
        assert_eq!(first.state.services.len(), 2);
        assert_eq!(
            first.commands,
            vec![Command::WriteDescriptor {
                handle,
                descriptor: DescriptorRef {
                    service_uuid: config.target.service,
                    characteristic_uuid: config.target.characteristic,
                    uuid: CCCD_UUID,
                },
                value: vec![0x01, 0x00],
            }]
        );

        let second = fold(&first.state, &discovered(handle, &config.target), &config).unwrap();
        assert!(second.state.notification_armed);
        assert!(second.commands.is_empty());
    }

    #[test]
    fn should_not_arm_notification_when_target_missing() {
        let config = RouterConfig::default();
        let handle = HandleId::new();
        let state = ConnectionState {
            transport_handle: Some(handle),
            phase: ConnectionPhase::Connected,
            ..ConnectionState::initial()
        };
        let other = RouterConfig {
            target: GattTarget {
                service: volv0x_domain::gatt::uuid_from_u16(0xAAAA),
                characteristic: volv0x_domain::gatt::uuid_from_u16(0xBBBB),
            },
            ..config
        };

        let transition = fold(&state, &discovered(handle, &config.target), &other).unwrap();
        assert!(!transition.state.notification_armed);
        assert!(transition.commands.is_empty());
        assert_eq!(transition.state.services.len(), 2);
    }

    #[test]
    fn should_keep_services_empty_when_discovery_fails() {
        let config = RouterConfig::default();
        let handle = HandleId::new();
        let state = ConnectionState {
            transport_handle: Some(handle),
            phase: ConnectionPhase::Connected,
            ..ConnectionState::initial()
        };
        let event = TransportEvent::ServicesDiscovered {
            handle,
            services: crate::testing::patch_services(&config.target),
            status: GattStatus::FAILURE,
        };

        let transition = fold(&state, &event, &config).unwrap();
        assert!(transition.state.services.is_empty());
        assert!(!transition.state.notification_armed);
        assert!(transition.commands.is_empty());
        assert_eq!(
            transition.state.last_error,
            Some(TransportStatusError {
                operation: GattOperation::DiscoverServices,
                status: GattStatus::FAILURE,
            })
        );
    }

    #[test]
    fn should_drop_malformed_notification() {
        let config = RouterConfig::default();
        let handle = HandleId::new();
        let state = ConnectionState {
            transport_handle: Some(handle),
            ..ConnectionState::initial()
        };
        let result = fold(&state, &notification(handle, &config.target, &[0x01, 0x90]), &config);
        assert_eq!(
            result,
            Err(GattError::MalformedPayload(PayloadError::Malformed {
                expected: 4,
                actual: 2
            }))
        );
    }

    #[test]
    fn should_ignore_value_of_untracked_characteristic() {
        let config = RouterConfig::default();
        let handle = HandleId::new();
        let state = ConnectionState {
            transport_handle: Some(handle),
            ..ConnectionState::initial()
        };
        let characteristic = volv0x_domain::gatt::uuid_from_u16(0x2A19);
        let event = TransportEvent::CharacteristicChanged {
            handle,
            characteristic,
            value: vec![0, 0, 0, 0],
        };
        assert_eq!(
            fold(&state, &event, &config),
            Err(GattError::UntrackedCharacteristic { characteristic })
        );
    }

    #[test]
    fn should_record_failed_read_without_decoding() {
        let config = RouterConfig::default();
        let handle = HandleId::new();
        let state = ConnectionState {
            transport_handle: Some(handle),
            ..ConnectionState::initial()
        };
        let event = TransportEvent::CharacteristicRead {
            handle,
            characteristic: config.target.characteristic,
            value: Vec::new(),
            status: GattStatus::ERROR,
        };

        let transition = fold(&state, &event, &config).unwrap();
        assert!(transition.state.last_reading.is_none());
        assert_eq!(
            transition.state.last_error.map(|e| e.operation),
            Some(GattOperation::ReadCharacteristic)
        );
    }

    #[test]
    fn should_keep_mtu_when_mtu_request_fails() {
        let config = RouterConfig::default();
        let handle = HandleId::new();
        let state = ConnectionState {
            transport_handle: Some(handle),
            negotiated_mtu: 185,
            ..ConnectionState::initial()
        };
        let event = TransportEvent::MtuChanged {
            handle,
            mtu: 23,
            status: GattStatus::REQUEST_NOT_SUPPORTED,
        };

        let transition = fold(&state, &event, &config).unwrap();
        assert_eq!(transition.state.negotiated_mtu, 185);
        assert!(transition.state.last_error.is_some());
    }

    // ── GattEventRouter ─────────────────────────────────────────────────

    #[test]
    fn should_open_handle_and_enter_connecting_on_connect() {
        let (mut router, transport) = router();
        router.connect();

        let opened = transport.opened();
        assert_eq!(opened.len(), 1);
        assert_eq!(router.state().transport_handle, Some(opened[0]));
        assert_eq!(router.state().phase, ConnectionPhase::Connecting);
        assert_eq!(
            transport.calls()[0],
            Call::Open {
                peripheral: peripheral(),
                handle: opened[0]
            }
        );
    }

    #[test]
    fn should_enter_connected_when_transport_reports_connected() {
        let (router, _, handle) = connected_router();
        assert_eq!(router.state().phase, ConnectionPhase::Connected);
        assert_eq!(router.state().transport_handle, Some(handle));
    }

    #[test]
    fn should_ignore_connect_while_connected() {
        let (mut router, transport, _) = connected_router();
        router.connect();
        assert!(transport.calls().is_empty());
        assert_eq!(router.state().phase, ConnectionPhase::Connected);
    }

    #[test]
    fn should_issue_single_enable_notification_for_duplicate_discovery() {
        let (mut router, transport, handle) = connected_router();
        let target = router.config().target;

        router.handle_event(&discovered(handle, &target)).unwrap();
        router.handle_event(&discovered(handle, &target)).unwrap();

        assert_eq!(transport.count(is_enable_notification), 1);
        assert!(router.state().notification_armed);
    }

    #[test]
    fn should_deliver_snapshots_in_event_order() {
        let (mut router, _, handle) = connected_router();
        let seen = recorded_snapshots(&mut router);
        let target = router.config().target;

        router
            .handle_event(&TransportEvent::MtuChanged {
                handle,
                mtu: 185,
                status: GattStatus::SUCCESS,
            })
            .unwrap();
        router.handle_event(&discovered(handle, &target)).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].negotiated_mtu, 185);
        assert!(seen[0].services.is_empty());
        assert_eq!(seen[1].negotiated_mtu, 185);
        assert_eq!(seen[1].services.len(), 2);
    }

    #[test]
    fn should_decode_notification_into_last_reading() {
        let (mut router, _, handle) = connected_router();
        let target = router.config().target;

        router
            .handle_event(&notification(handle, &target, &[0x01, 0x90, 0x0B, 0xB8]))
            .unwrap();

        let reading = router.state().last_reading.unwrap();
        assert_eq!(
            reading,
            SensorReading {
                distance_millimeters: 400,
                battery_millivolts: 3000,
            }
        );
        assert_eq!(classify(reading.distance_millimeters), AlertTier::High);
        assert_eq!(router.state().alert_tier(), AlertTier::High);
    }

    #[test]
    fn should_leave_state_untouched_when_payload_malformed() {
        let (mut router, _, handle) = connected_router();
        let seen = recorded_snapshots(&mut router);
        let target = router.config().target;
        let before = router.state().clone();

        let result = router.handle_event(&notification(handle, &target, &[0x01]));

        assert!(matches!(result, Err(GattError::MalformedPayload(_))));
        assert_eq!(router.state(), &before);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn should_decode_read_response() {
        let (mut router, _, handle) = connected_router();
        let target = router.config().target;

        router
            .handle_event(&TransportEvent::CharacteristicRead {
                handle,
                characteristic: target.characteristic,
                value: vec![0x06, 0x40, 0x0C, 0xE4],
                status: GattStatus::SUCCESS,
            })
            .unwrap();

        let reading = router.state().last_reading.unwrap();
        assert_eq!(reading.distance_millimeters, 1600);
        assert_eq!(reading.battery_millivolts, 3300);
    }

    #[test]
    fn should_track_write_acknowledgement() {
        let (mut router, _, handle) = connected_router();
        let target = router.config().target;

        router
            .handle_event(&TransportEvent::CharacteristicWrite {
                handle,
                characteristic: target.characteristic,
                status: GattStatus::SUCCESS,
            })
            .unwrap();
        assert!(router.state().last_write_acknowledged);

        router
            .handle_event(&TransportEvent::CharacteristicWrite {
                handle,
                characteristic: target.characteristic,
                status: GattStatus::FAILURE,
            })
            .unwrap();
        assert!(!router.state().last_write_acknowledged);
        assert_eq!(
            router.state().last_error.as_ref().map(|e| e.operation),
            Some(GattOperation::WriteCharacteristic)
        );
    }

    #[test]
    fn should_disconnect_and_clear_services_even_on_failure_status() {
        let (mut router, _, handle) = connected_router();
        let target = router.config().target;
        router.handle_event(&discovered(handle, &target)).unwrap();

        router
            .handle_event(&disconnected(handle, GattStatus::from_code(0x08)))
            .unwrap();

        let state = router.state();
        assert_eq!(state.phase, ConnectionPhase::Disconnected);
        assert!(state.services.is_empty());
        assert!(!state.notification_armed);
        assert_eq!(state.transport_handle, Some(handle));
        assert_eq!(
            state.last_error,
            Some(TransportStatusError {
                operation: GattOperation::Connect,
                status: GattStatus::from_code(0x08),
            })
        );
    }

    #[test]
    fn should_reuse_handle_and_rearm_notification_after_reconnect() {
        let (mut router, transport, handle) = connected_router();
        let target = router.config().target;
        router.handle_event(&discovered(handle, &target)).unwrap();
        router
            .handle_event(&disconnected(handle, GattStatus::SUCCESS))
            .unwrap();

        router.connect();
        assert_eq!(transport.opened().len(), 0);
        assert!(transport.calls().contains(&Call::Reconnect(handle)));
        assert_eq!(router.state().phase, ConnectionPhase::Connecting);

        router.handle_event(&connected(handle)).unwrap();
        router.handle_event(&discovered(handle, &target)).unwrap();
        assert_eq!(transport.count(is_enable_notification), 2);
    }

    #[test]
    fn should_close_link_on_disconnect() {
        let (mut router, transport, handle) = connected_router();
        router.disconnect();
        assert_eq!(router.state().phase, ConnectionPhase::Disconnecting);
        assert_eq!(transport.calls(), vec![Call::Close(handle)]);
    }

    #[test]
    fn should_ignore_disconnect_without_handle() {
        let (mut router, transport) = router();
        router.disconnect();
        assert!(transport.calls().is_empty());
        assert_eq!(router.state().phase, ConnectionPhase::Disconnected);
    }

    #[test]
    fn should_clamp_requested_mtu() {
        let (mut router, transport, handle) = connected_router();
        router.request_mtu(1000);
        router.request_mtu(5);
        router.request_mtu(185);
        assert_eq!(
            transport.calls(),
            vec![
                Call::RequestMtu { handle, size: 517 },
                Call::RequestMtu { handle, size: 23 },
                Call::RequestMtu { handle, size: 185 },
            ]
        );
        assert_eq!(router.state().negotiated_mtu, UNKNOWN_MTU);
    }

    #[test]
    fn should_only_discover_when_connected() {
        let (mut router, transport) = router();
        router.discover();
        assert!(transport.calls().is_empty());

        let (mut router, transport, handle) = connected_router();
        router.discover();
        assert_eq!(transport.calls(), vec![Call::DiscoverServices(handle)]);
    }

    #[test]
    fn should_write_greeting_once_target_discovered() {
        let (mut router, transport, handle) = connected_router();
        let target = router.config().target;

        router.write_greeting();
        assert!(transport.calls().is_empty());

        router.handle_event(&discovered(handle, &target)).unwrap();
        transport.clear();
        router.write_greeting();
        assert_eq!(
            transport.calls(),
            vec![Call::WriteCharacteristic {
                handle,
                characteristic: target.characteristic,
                value: b"Hello Patch!".to_vec(),
                write_type: WriteType::WithResponse,
            }]
        );
    }

    #[test]
    fn should_read_target_characteristic_once_discovered() {
        let (mut router, transport, handle) = connected_router();
        let target = router.config().target;

        router.read_characteristic();
        assert!(transport.calls().is_empty());

        router.handle_event(&discovered(handle, &target)).unwrap();
        transport.clear();
        router.read_characteristic();
        assert_eq!(
            transport.calls(),
            vec![Call::ReadCharacteristic {
                handle,
                characteristic: target.characteristic,
            }]
        );
    }

    #[test]
    fn should_release_handle_and_reset_state() {
        let (mut router, transport, handle) = connected_router();
        assert!(router.release());
        assert_eq!(
            transport.calls(),
            vec![Call::Close(handle), Call::Release(handle)]
        );
        assert!(router.state().transport_handle.is_none());
        assert_eq!(router.state().phase, ConnectionPhase::Disconnected);
        assert!(!router.release());
    }
}
