//! Commands emitted by [`fold`](super::fold) and dispatched to the transport.

use volv0x_domain::gatt::{CharacteristicDescriptor, DescriptorRef, WriteType};
use volv0x_domain::id::HandleId;

use crate::ports::Transport;

/// A follow-up transport command produced by a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Reconnect {
        handle: HandleId,
    },
    Close {
        handle: HandleId,
    },
    Release {
        handle: HandleId,
    },
    DiscoverServices {
        handle: HandleId,
    },
    WriteDescriptor {
        handle: HandleId,
        descriptor: DescriptorRef,
        value: Vec<u8>,
    },
    WriteCharacteristic {
        handle: HandleId,
        characteristic: CharacteristicDescriptor,
        value: Vec<u8>,
        write_type: WriteType,
    },
    ReadCharacteristic {
        handle: HandleId,
        characteristic: CharacteristicDescriptor,
    },
    RequestMtu {
        handle: HandleId,
        size: u16,
    },
}

impl Command {
    /// Hand the command to the transport. Never blocks.
    pub fn dispatch<T: Transport + ?Sized>(&self, transport: &T) {
        match self {
            Self::Reconnect { handle } => transport.reconnect(*handle),
            Self::Close { handle } => transport.close(*handle),
            Self::Release { handle } => transport.release(*handle),
            Self::DiscoverServices { handle } => transport.discover_services(*handle),
            Self::WriteDescriptor {
                handle,
                descriptor,
                value,
            } => transport.write_descriptor(*handle, descriptor, value),
            Self::WriteCharacteristic {
                handle,
                characteristic,
                value,
                write_type,
            } => transport.write_characteristic(*handle, characteristic, value, *write_type),
            Self::ReadCharacteristic {
                handle,
                characteristic,
            } => transport.read_characteristic(*handle, characteristic),
            Self::RequestMtu { handle, size } => transport.request_mtu(*handle, *size),
        }
    }
}
