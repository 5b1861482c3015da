//! Conversions between btleplug's GATT model and the domain descriptors.

use btleplug::api::{CharPropFlags, Characteristic, Descriptor, Peripheral as _, Service};
use btleplug::platform::Peripheral;

use volv0x_domain::gatt::{
    CharacteristicDescriptor, CharacteristicProperties, DescriptorRef, ServiceDescriptor,
};

fn properties(flags: CharPropFlags) -> CharacteristicProperties {
    CharacteristicProperties {
        read: flags.contains(CharPropFlags::READ),
        write: flags.contains(CharPropFlags::WRITE),
        write_without_response: flags.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE),
        notify: flags.contains(CharPropFlags::NOTIFY),
        indicate: flags.contains(CharPropFlags::INDICATE),
    }
}

fn characteristic(characteristic: &Characteristic) -> CharacteristicDescriptor {
    CharacteristicDescriptor {
        uuid: characteristic.uuid,
        service_uuid: characteristic.service_uuid,
        properties: properties(characteristic.properties),
        descriptors: characteristic.descriptors.iter().map(|d| d.uuid).collect(),
    }
}

pub(crate) fn service(service: &Service) -> ServiceDescriptor {
    ServiceDescriptor {
        uuid: service.uuid,
        primary: service.primary,
        characteristics: service.characteristics.iter().map(characteristic).collect(),
    }
}

/// Services the peripheral exposes after discovery.
pub(crate) fn services(peripheral: &Peripheral) -> Vec<ServiceDescriptor> {
    peripheral.services().iter().map(service).collect()
}

/// Resolve a domain characteristic against the peripheral's discovered table.
pub(crate) fn find_characteristic(
    peripheral: &Peripheral,
    wanted: &CharacteristicDescriptor,
) -> Option<Characteristic> {
    peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == wanted.uuid && c.service_uuid == wanted.service_uuid)
}

/// Resolve the characteristic owning `descriptor`.
pub(crate) fn find_owner(peripheral: &Peripheral, descriptor: &DescriptorRef) -> Option<Characteristic> {
    peripheral.characteristics().into_iter().find(|c| {
        c.uuid == descriptor.characteristic_uuid && c.service_uuid == descriptor.service_uuid
    })
}

pub(crate) fn descriptor(descriptor: &DescriptorRef) -> Descriptor {
    Descriptor {
        uuid: descriptor.uuid,
        service_uuid: descriptor.service_uuid,
        characteristic_uuid: descriptor.characteristic_uuid,
    }
}
