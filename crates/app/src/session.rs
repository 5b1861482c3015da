//! Session — the single-writer loop that owns the connection state machine.
//!
//! Transport events and consumer requests are funnelled through two
//! channels into one task, which is the only place the
//! [`LifecycleBinder`] (and thus the [`ConnectionState`]) is touched. The
//! order snapshots are published in is the order events were received.

use tokio::sync::{broadcast, mpsc};

use volv0x_domain::connection::ConnectionState;
use volv0x_domain::event::TransportEvent;

use crate::lifecycle::LifecycleBinder;
use crate::ports::Transport;
use crate::snapshot_bus::SnapshotBus;

/// Consumer request handled by the session loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Foreground,
    Background,
    Connect,
    Disconnect,
    RequestMtu(u16),
    Discover,
    WriteGreeting,
    ReadCharacteristic,
    Shutdown,
}

/// The session task has exited; requests can no longer be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection session has stopped")]
pub struct SessionClosed;

/// Owns the binder and processes events and controls one at a time.
pub struct Session<T: Transport> {
    binder: LifecycleBinder<T>,
    events: mpsc::Receiver<TransportEvent>,
    controls: mpsc::Receiver<Control>,
}

impl<T: Transport> Session<T> {
    /// Wrap `binder`, consuming transport events from `events`.
    ///
    /// Returns the session (to be run on its own task) and the handle
    /// consumers use to drive it. `capacity` bounds both the control queue
    /// and the snapshot broadcast buffer.
    pub fn new(
        mut binder: LifecycleBinder<T>,
        events: mpsc::Receiver<TransportEvent>,
        capacity: usize,
    ) -> (Self, SessionHandle) {
        let bus = SnapshotBus::new(capacity);
        let snapshots = bus.subscribe();
        binder.router_mut().subscribe(bus);
        let (tx, controls) = mpsc::channel(capacity);

        let session = Self {
            binder,
            events,
            controls,
        };
        (
            session,
            SessionHandle {
                controls: tx,
                snapshots,
            },
        )
    }

    /// Process events and controls until shutdown, then tear down.
    ///
    /// The loop also ends when every [`SessionHandle`] is dropped or the
    /// transport event stream closes. Teardown runs in every case.
    pub async fn run(mut self) {
        tracing::info!(
            peripheral = %self.binder.router().peripheral(),
            "connection session started"
        );

        loop {
            tokio::select! {
                control = self.controls.recv() => match control {
                    Some(Control::Shutdown) | None => break,
                    Some(control) => self.apply(control),
                },
                event = self.events.recv() => match event {
                    Some(event) => {
                        let _ = self.binder.router_mut().handle_event(&event);
                    }
                    None => {
                        tracing::warn!("transport event stream closed");
                        break;
                    }
                },
            }
        }

        self.binder.on_teardown();
        tracing::info!("connection session stopped");
    }

    fn apply(&mut self, control: Control) {
        tracing::debug!(?control, "session control");
        match control {
            Control::Foreground => self.binder.on_foreground(),
            Control::Background => self.binder.on_background(),
            Control::Connect => self.binder.router_mut().connect(),
            Control::Disconnect => self.binder.router_mut().disconnect(),
            Control::RequestMtu(size) => self.binder.router_mut().request_mtu(size),
            Control::Discover => self.binder.router_mut().discover(),
            Control::WriteGreeting => self.binder.router_mut().write_greeting(),
            Control::ReadCharacteristic => self.binder.router_mut().read_characteristic(),
            Control::Shutdown => {}
        }
    }
}

/// Cloneable consumer-side handle to a running [`Session`].
///
/// Holds no publishing end of the snapshot bus: subscribers see the bus
/// close once the session task has exited.
#[derive(Debug)]
pub struct SessionHandle {
    controls: mpsc::Sender<Control>,
    snapshots: broadcast::Receiver<ConnectionState>,
}

impl Clone for SessionHandle {
    fn clone(&self) -> Self {
        Self {
            controls: self.controls.clone(),
            snapshots: self.snapshots.resubscribe(),
        }
    }
}

impl SessionHandle {
    /// Receive every snapshot published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionState> {
        self.snapshots.resubscribe()
    }

    /// # Errors
    ///
    /// Returns [`SessionClosed`] if the session task has exited.
    pub async fn foreground(&self) -> Result<(), SessionClosed> {
        self.send(Control::Foreground).await
    }

    /// # Errors
    ///
    /// Returns [`SessionClosed`] if the session task has exited.
    pub async fn background(&self) -> Result<(), SessionClosed> {
        self.send(Control::Background).await
    }

    /// Manual (re)connect; there is no automatic retry.
    ///
    /// # Errors
    ///
    /// Returns [`SessionClosed`] if the session task has exited.
    pub async fn connect(&self) -> Result<(), SessionClosed> {
        self.send(Control::Connect).await
    }

    /// # Errors
    ///
    /// Returns [`SessionClosed`] if the session task has exited.
    pub async fn disconnect(&self) -> Result<(), SessionClosed> {
        self.send(Control::Disconnect).await
    }

    /// # Errors
    ///
    /// Returns [`SessionClosed`] if the session task has exited.
    pub async fn request_mtu(&self, size: u16) -> Result<(), SessionClosed> {
        self.send(Control::RequestMtu(size)).await
    }

    /// # Errors
    ///
    /// Returns [`SessionClosed`] if the session task has exited.
    pub async fn discover(&self) -> Result<(), SessionClosed> {
        self.send(Control::Discover).await
    }

    /// # Errors
    ///
    /// Returns [`SessionClosed`] if the session task has exited.
    pub async fn write_greeting(&self) -> Result<(), SessionClosed> {
        self.send(Control::WriteGreeting).await
    }

    /// # Errors
    ///
    /// Returns [`SessionClosed`] if the session task has exited.
    pub async fn read_characteristic(&self) -> Result<(), SessionClosed> {
        self.send(Control::ReadCharacteristic).await
    }

    /// Ask the session to tear down and exit.
    ///
    /// # Errors
    ///
    /// Returns [`SessionClosed`] if the session task has already exited.
    pub async fn shutdown(&self) -> Result<(), SessionClosed> {
        self.send(Control::Shutdown).await
    }

    async fn send(&self, control: Control) -> Result<(), SessionClosed> {
        self.controls.send(control).await.map_err(|_| SessionClosed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::task::JoinHandle;
    use volv0x_domain::connection::ConnectionPhase;
    use volv0x_domain::gatt::GattStatus;

    use super::*;
    use crate::router::RouterConfig;
    use crate::testing::{Call, RecordingTransport, connected, discovered, notification, peripheral};

    struct Harness {
        handle: SessionHandle,
        events: mpsc::Sender<TransportEvent>,
        snapshots: broadcast::Receiver<ConnectionState>,
        transport: RecordingTransport,
        task: JoinHandle<()>,
    }

    fn start() -> Harness {
        let transport = RecordingTransport::default();
        let binder = LifecycleBinder::new(transport.clone(), peripheral(), RouterConfig::default());
        let (events, rx) = mpsc::channel(16);
        let (session, handle) = Session::new(binder, rx, 16);
        let snapshots = handle.subscribe();
        let task = tokio::spawn(session.run());
        Harness {
            handle,
            events,
            snapshots,
            transport,
            task,
        }
    }

    async fn next(snapshots: &mut broadcast::Receiver<ConnectionState>) -> ConnectionState {
        tokio::time::timeout(Duration::from_secs(1), snapshots.recv())
            .await
            .expect("snapshot should arrive")
            .expect("bus should be open")
    }

    #[tokio::test]
    async fn should_connect_on_foreground() {
        let mut h = start();
        h.handle.foreground().await.unwrap();

        let state = next(&mut h.snapshots).await;
        assert_eq!(state.phase, ConnectionPhase::Connecting);
        assert_eq!(h.transport.opened().len(), 1);
    }

    #[tokio::test]
    async fn should_publish_snapshots_in_event_order() {
        let mut h = start();
        h.handle.foreground().await.unwrap();
        next(&mut h.snapshots).await;
        let handle = h.transport.opened()[0];
        let target = RouterConfig::default().target;

        h.events.send(connected(handle)).await.unwrap();
        h.events
            .send(TransportEvent::MtuChanged {
                handle,
                mtu: 185,
                status: GattStatus::SUCCESS,
            })
            .await
            .unwrap();
        h.events.send(discovered(handle, &target)).await.unwrap();
        h.events
            .send(notification(handle, &target, &[0x01, 0x2C, 0x0B, 0xB8]))
            .await
            .unwrap();

        let s1 = next(&mut h.snapshots).await;
        let s2 = next(&mut h.snapshots).await;
        let s3 = next(&mut h.snapshots).await;
        let s4 = next(&mut h.snapshots).await;
        assert_eq!(s1.phase, ConnectionPhase::Connected);
        assert_eq!(s2.negotiated_mtu, 185);
        assert!(s2.services.is_empty());
        assert_eq!(s3.negotiated_mtu, 185);
        assert!(s3.notification_armed);
        assert_eq!(s4.last_reading.map(|r| r.distance_millimeters), Some(300));
    }

    #[tokio::test]
    async fn should_forward_consumer_requests_to_router() {
        let mut h = start();
        h.handle.foreground().await.unwrap();
        next(&mut h.snapshots).await;
        let handle = h.transport.opened()[0];
        let target = RouterConfig::default().target;
        h.events.send(connected(handle)).await.unwrap();
        next(&mut h.snapshots).await;
        h.events.send(discovered(handle, &target)).await.unwrap();
        next(&mut h.snapshots).await;

        h.handle.request_mtu(185).await.unwrap();
        h.handle.discover().await.unwrap();
        h.handle.write_greeting().await.unwrap();
        h.handle.read_characteristic().await.unwrap();
        h.handle.disconnect().await.unwrap();

        let state = next(&mut h.snapshots).await;
        assert_eq!(state.phase, ConnectionPhase::Disconnecting);
        let calls = h.transport.calls();
        assert!(calls.contains(&Call::RequestMtu { handle, size: 185 }));
        assert!(calls.contains(&Call::DiscoverServices(handle)));
        assert!(calls.contains(&Call::Close(handle)));
        assert!(calls
            .iter()
            .any(|c| matches!(c, Call::WriteCharacteristic { value, .. } if value.as_slice() == b"Hello Patch!")));
        assert!(calls
            .iter()
            .any(|c| matches!(c, Call::ReadCharacteristic { .. })));
    }

    #[tokio::test]
    async fn should_teardown_on_shutdown() {
        let h = start();
        h.handle.foreground().await.unwrap();
        h.handle.shutdown().await.unwrap();
        h.task.await.unwrap();

        let handle = h.transport.opened()[0];
        assert!(h.transport.calls().contains(&Call::Release(handle)));
        assert_eq!(h.handle.connect().await, Err(SessionClosed));
    }

    #[tokio::test]
    async fn should_teardown_when_event_stream_closes() {
        let h = start();
        h.handle.foreground().await.unwrap();
        let mut snapshots = h.snapshots;
        next(&mut snapshots).await;

        drop(h.events);
        h.task.await.unwrap();

        let handle = h.transport.opened()[0];
        assert!(h.transport.calls().contains(&Call::Release(handle)));
        assert_eq!(next(&mut snapshots).await.phase, ConnectionPhase::Disconnected);
        assert!(matches!(
            snapshots.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}
