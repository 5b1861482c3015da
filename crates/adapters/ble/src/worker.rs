//! Per-handle worker: executes queued GATT commands one after another and
//! reports each completion as a [`TransportEvent`].

use std::ops::ControlFlow;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt as _;

use volv0x_domain::connection::ConnectionPhase;
use volv0x_domain::event::TransportEvent;
use volv0x_domain::gatt::{
    CCCD_UUID, CharacteristicDescriptor, DEFAULT_ATT_MTU, DescriptorRef, GattStatus, WriteType,
};
use volv0x_domain::id::HandleId;

use crate::link::GattLink;
use crate::status::status_from;

/// A command queued for one handle.
#[derive(Debug)]
pub(crate) enum Job {
    Connect,
    Close,
    Release,
    /// The adapter reported the peripheral as disconnected.
    LinkLost,
    Discover,
    WriteDescriptor {
        descriptor: DescriptorRef,
        value: Vec<u8>,
    },
    WriteCharacteristic {
        characteristic: CharacteristicDescriptor,
        value: Vec<u8>,
        write_type: WriteType,
    },
    Read {
        characteristic: CharacteristicDescriptor,
    },
    RequestMtu {
        size: u16,
    },
}

pub(crate) struct Worker<L> {
    handle: HandleId,
    link: L,
    events: mpsc::Sender<TransportEvent>,
    connected: bool,
    pump: Option<JoinHandle<()>>,
}

impl<L: GattLink> Worker<L> {
    pub(crate) fn new(handle: HandleId, link: L, events: mpsc::Sender<TransportEvent>) -> Self {
        Self {
            handle,
            link,
            events,
            connected: false,
            pump: None,
        }
    }

    /// Execute jobs until the handle is released or the event receiver goes
    /// away.
    pub(crate) async fn run(mut self, mut jobs: mpsc::UnboundedReceiver<Job>) {
        while let Some(job) = jobs.recv().await {
            tracing::trace!(handle = %self.handle, ?job, "transport job");
            if self.execute(job).await.is_break() {
                break;
            }
        }
        self.stop_pump();
        tracing::debug!(handle = %self.handle, "transport worker stopped");
    }

    async fn execute(&mut self, job: Job) -> ControlFlow<()> {
        let handle = self.handle;
        match job {
            Job::Connect => {
                let result = self.link.connect().await;
                let status = status_from("connect", &result);
                let phase = if status.is_success() {
                    self.connected = true;
                    self.start_pump();
                    ConnectionPhase::Connected
                } else {
                    ConnectionPhase::Disconnected
                };
                self.emit(TransportEvent::ConnectionStateChanged {
                    handle,
                    status,
                    phase,
                })
                .await
            }
            Job::Close => {
                self.stop_pump();
                self.connected = false;
                let result = self.link.disconnect().await;
                let status = status_from("disconnect", &result);
                self.emit(TransportEvent::ConnectionStateChanged {
                    handle,
                    status,
                    phase: ConnectionPhase::Disconnected,
                })
                .await
            }
            Job::Release => {
                self.stop_pump();
                if self.connected {
                    self.connected = false;
                    if let Err(err) = self.link.disconnect().await {
                        tracing::warn!(%handle, %err, "disconnect on release failed");
                    }
                }
                ControlFlow::Break(())
            }
            Job::LinkLost => {
                if !self.connected {
                    return ControlFlow::Continue(());
                }
                // The report may trail a close that a reconnect already undid.
                if matches!(self.link.is_connected().await, Ok(true)) {
                    tracing::debug!(%handle, "stale disconnect report ignored, link is up");
                    return ControlFlow::Continue(());
                }
                self.connected = false;
                self.stop_pump();
                tracing::info!(%handle, "link lost");
                self.emit(TransportEvent::ConnectionStateChanged {
                    handle,
                    status: GattStatus::FAILURE,
                    phase: ConnectionPhase::Disconnected,
                })
                .await
            }
            Job::Discover => {
                let result = self.link.discover_services().await;
                let status = status_from("discover services", &result);
                self.emit(TransportEvent::ServicesDiscovered {
                    handle,
                    services: result.unwrap_or_default().into(),
                    status,
                })
                .await
            }
            Job::WriteDescriptor { descriptor, value } => {
                if let Err(err) = self.write_descriptor(&descriptor, &value).await {
                    tracing::warn!(%handle, descriptor = %descriptor.uuid, %err, "descriptor write failed");
                }
                ControlFlow::Continue(())
            }
            Job::WriteCharacteristic {
                characteristic,
                value,
                write_type,
            } => {
                let result = self.link.write(&characteristic, &value, write_type).await;
                let status = status_from("write characteristic", &result);
                self.emit(TransportEvent::CharacteristicWrite {
                    handle,
                    characteristic: characteristic.uuid,
                    status,
                })
                .await
            }
            Job::Read { characteristic } => {
                let result = self.link.read(&characteristic).await;
                let status = status_from("read characteristic", &result);
                self.emit(TransportEvent::CharacteristicRead {
                    handle,
                    characteristic: characteristic.uuid,
                    value: result.unwrap_or_default(),
                    status,
                })
                .await
            }
            Job::RequestMtu { size } => {
                tracing::debug!(%handle, size, "MTU negotiation is not exposed by btleplug");
                self.emit(TransportEvent::MtuChanged {
                    handle,
                    mtu: DEFAULT_ATT_MTU,
                    status: GattStatus::REQUEST_NOT_SUPPORTED,
                })
                .await
            }
        }
    }

    /// CCCD writes go through subscribe / unsubscribe so btleplug keeps its
    /// notification routing in sync.
    async fn write_descriptor(
        &self,
        descriptor: &DescriptorRef,
        value: &[u8],
    ) -> Result<(), btleplug::Error> {
        if descriptor.uuid != CCCD_UUID {
            return self.link.write_descriptor(descriptor, value).await;
        }
        match value {
            [0x00, 0x00] => self.link.unsubscribe(descriptor).await,
            _ => self.link.subscribe(descriptor).await,
        }
    }

    async fn emit(&self, event: TransportEvent) -> ControlFlow<()> {
        if self.events.send(event).await.is_err() {
            tracing::debug!(handle = %self.handle, "transport event receiver dropped");
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    fn start_pump(&mut self) {
        if self.pump.as_ref().is_some_and(|pump| !pump.is_finished()) {
            return;
        }
        self.pump = Some(tokio::spawn(pump_notifications(
            self.handle,
            self.link.clone(),
            self.events.clone(),
        )));
    }

    fn stop_pump(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

async fn pump_notifications<L: GattLink>(
    handle: HandleId,
    link: L,
    events: mpsc::Sender<TransportEvent>,
) {
    let mut notifications = match link.notifications().await {
        Ok(stream) => stream,
        Err(err) => {
            tracing::warn!(%handle, %err, "could not open notification stream");
            return;
        }
    };

    while let Some(notification) = notifications.next().await {
        let event = TransportEvent::CharacteristicChanged {
            handle,
            characteristic: notification.uuid,
            value: notification.value,
        };
        if events.send(event).await.is_err() {
            break;
        }
    }
}
