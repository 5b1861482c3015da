//! Transport port — the commands the core issues to the BLE stack.
//!
//! Every method is fire-and-forget: implementations enqueue the work and
//! return immediately. Completion is reported later as a
//! [`TransportEvent`](volv0x_domain::event::TransportEvent) carrying the same
//! [`HandleId`]. Implementations must deliver the events of one handle one at
//! a time and in order.

use volv0x_domain::gatt::{CharacteristicDescriptor, DescriptorRef, WriteType};
use volv0x_domain::id::{HandleId, PeripheralId};

/// Outbound port to a BLE GATT client stack.
pub trait Transport: Send {
    /// Create a handle bound to `peripheral` and start connecting.
    fn open(&self, peripheral: &PeripheralId) -> HandleId;

    /// Re-open the link on an existing handle.
    fn reconnect(&self, handle: HandleId);

    /// Close the link; the handle stays usable for [`reconnect`](Self::reconnect).
    fn close(&self, handle: HandleId);

    /// Destroy the handle and free its native resources.
    fn release(&self, handle: HandleId);

    fn discover_services(&self, handle: HandleId);

    fn write_descriptor(&self, handle: HandleId, descriptor: &DescriptorRef, value: &[u8]);

    fn write_characteristic(
        &self,
        handle: HandleId,
        characteristic: &CharacteristicDescriptor,
        value: &[u8],
        write_type: WriteType,
    );

    fn read_characteristic(&self, handle: HandleId, characteristic: &CharacteristicDescriptor);

    fn request_mtu(&self, handle: HandleId, size: u16);
}

impl<T: Transport + Sync + ?Sized> Transport for std::sync::Arc<T> {
    fn open(&self, peripheral: &PeripheralId) -> HandleId {
        (**self).open(peripheral)
    }

    fn reconnect(&self, handle: HandleId) {
        (**self).reconnect(handle);
    }

    fn close(&self, handle: HandleId) {
        (**self).close(handle);
    }

    fn release(&self, handle: HandleId) {
        (**self).release(handle);
    }

    fn discover_services(&self, handle: HandleId) {
        (**self).discover_services(handle);
    }

    fn write_descriptor(&self, handle: HandleId, descriptor: &DescriptorRef, value: &[u8]) {
        (**self).write_descriptor(handle, descriptor, value);
    }

    fn write_characteristic(
        &self,
        handle: HandleId,
        characteristic: &CharacteristicDescriptor,
        value: &[u8],
        write_type: WriteType,
    ) {
        (**self).write_characteristic(handle, characteristic, value, write_type);
    }

    fn read_characteristic(&self, handle: HandleId, characteristic: &CharacteristicDescriptor) {
        (**self).read_characteristic(handle, characteristic);
    }

    fn request_mtu(&self, handle: HandleId, size: u16) {
        (**self).request_mtu(handle, size);
    }
}
