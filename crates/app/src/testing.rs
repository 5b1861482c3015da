//! Test doubles shared by the unit tests of this crate.

use std::sync::{Arc, Mutex};

use volv0x_domain::connection::ConnectionPhase;
use volv0x_domain::event::TransportEvent;
use volv0x_domain::gatt::{
    CCCD_UUID, CharacteristicDescriptor, CharacteristicProperties, DescriptorRef, GattStatus,
    GattTarget, ServiceDescriptor, WriteType, uuid_from_u16,
};
use volv0x_domain::id::{HandleId, PeripheralId};

use crate::ports::Transport;

/// One call received by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open {
        peripheral: PeripheralId,
        handle: HandleId,
    },
    Reconnect(HandleId),
    Close(HandleId),
    Release(HandleId),
    DiscoverServices(HandleId),
    WriteDescriptor {
        handle: HandleId,
        descriptor: DescriptorRef,
        value: Vec<u8>,
    },
    WriteCharacteristic {
        handle: HandleId,
        characteristic: uuid::Uuid,
        value: Vec<u8>,
        write_type: WriteType,
    },
    ReadCharacteristic {
        handle: HandleId,
        characteristic: uuid::Uuid,
    },
    RequestMtu {
        handle: HandleId,
        size: u16,
    },
}

/// Transport that records calls instead of talking to a radio.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingTransport {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    pub fn opened(&self) -> Vec<HandleId> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::Open { handle, .. } => Some(*handle),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Transport for RecordingTransport {
    fn open(&self, peripheral: &PeripheralId) -> HandleId {
        let handle = HandleId::new();
        self.record(Call::Open {
            peripheral: peripheral.clone(),
            handle,
        });
        handle
    }

    fn reconnect(&self, handle: HandleId) {
        self.record(Call::Reconnect(handle));
    }

    fn close(&self, handle: HandleId) {
        self.record(Call::Close(handle));
    }

    fn release(&self, handle: HandleId) {
        self.record(Call::Release(handle));
    }

    fn discover_services(&self, handle: HandleId) {
        self.record(Call::DiscoverServices(handle));
    }

    fn write_descriptor(&self, handle: HandleId, descriptor: &DescriptorRef, value: &[u8]) {
        self.record(Call::WriteDescriptor {
            handle,
            descriptor: *descriptor,
            value: value.to_vec(),
        });
    }

    fn write_characteristic(
        &self,
        handle: HandleId,
        characteristic: &CharacteristicDescriptor,
        value: &[u8],
        write_type: WriteType,
    ) {
        self.record(Call::WriteCharacteristic {
            handle,
            characteristic: characteristic.uuid,
            value: value.to_vec(),
            write_type,
        });
    }

    fn read_characteristic(&self, handle: HandleId, characteristic: &CharacteristicDescriptor) {
        self.record(Call::ReadCharacteristic {
            handle,
            characteristic: characteristic.uuid,
        });
    }

    fn request_mtu(&self, handle: HandleId, size: u16) {
        self.record(Call::RequestMtu { handle, size });
    }
}

pub fn peripheral() -> PeripheralId {
    PeripheralId::new("AA:BB:CC:DD:EE:FF")
}

/// Services as exposed by the patch firmware: battery service plus the
/// telemetry service.
pub fn patch_services(target: &GattTarget) -> Arc<[ServiceDescriptor]> {
    let battery = uuid_from_u16(0x180F);
    Arc::from(vec![
        ServiceDescriptor {
            uuid: battery,
            primary: true,
            characteristics: vec![CharacteristicDescriptor {
                uuid: uuid_from_u16(0x2A19),
                service_uuid: battery,
                properties: CharacteristicProperties {
                    read: true,
                    ..CharacteristicProperties::default()
                },
                descriptors: Vec::new(),
            }],
        },
        ServiceDescriptor {
            uuid: target.service,
            primary: true,
            characteristics: vec![CharacteristicDescriptor {
                uuid: target.characteristic,
                service_uuid: target.service,
                properties: CharacteristicProperties {
                    read: true,
                    write: true,
                    notify: true,
                    ..CharacteristicProperties::default()
                },
                descriptors: vec![CCCD_UUID],
            }],
        },
    ])
}

pub fn connected(handle: HandleId) -> TransportEvent {
    TransportEvent::ConnectionStateChanged {
        handle,
        status: GattStatus::SUCCESS,
        phase: ConnectionPhase::Connected,
    }
}

pub fn disconnected(handle: HandleId, status: GattStatus) -> TransportEvent {
    TransportEvent::ConnectionStateChanged {
        handle,
        status,
        phase: ConnectionPhase::Disconnected,
    }
}

pub fn discovered(handle: HandleId, target: &GattTarget) -> TransportEvent {
    TransportEvent::ServicesDiscovered {
        handle,
        services: patch_services(target),
        status: GattStatus::SUCCESS,
    }
}

pub fn notification(handle: HandleId, target: &GattTarget, value: &[u8]) -> TransportEvent {
    TransportEvent::CharacteristicChanged {
        handle,
        characteristic: target.characteristic,
        value: value.to_vec(),
    }
}
