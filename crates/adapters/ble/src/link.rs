//! The GATT client operations a per-handle worker drives.

use std::future::Future;
use std::pin::Pin;

use btleplug::api::{self, ValueNotification};
use btleplug::platform::Peripheral;
use tokio_stream::Stream;

use volv0x_domain::gatt::{CharacteristicDescriptor, DescriptorRef, ServiceDescriptor, WriteType};

use crate::gatt;

/// Notifications pushed by the peripheral while subscribed.
pub(crate) type Notifications = Pin<Box<dyn Stream<Item = ValueNotification> + Send>>;

/// One remote GATT server as seen by a worker.
///
/// Characteristics and descriptors are resolved against the table of the
/// last discovery; unknown ones fail with
/// [`btleplug::Error::NoSuchCharacteristic`].
pub(crate) trait GattLink: Clone + Send + Sync + 'static {
    fn connect(&self) -> impl Future<Output = Result<(), btleplug::Error>> + Send;

    fn disconnect(&self) -> impl Future<Output = Result<(), btleplug::Error>> + Send;

    fn is_connected(&self) -> impl Future<Output = Result<bool, btleplug::Error>> + Send;

    /// Run discovery and return the resulting service table.
    fn discover_services(
        &self,
    ) -> impl Future<Output = Result<Vec<ServiceDescriptor>, btleplug::Error>> + Send;

    fn write(
        &self,
        characteristic: &CharacteristicDescriptor,
        value: &[u8],
        write_type: WriteType,
    ) -> impl Future<Output = Result<(), btleplug::Error>> + Send;

    fn read(
        &self,
        characteristic: &CharacteristicDescriptor,
    ) -> impl Future<Output = Result<Vec<u8>, btleplug::Error>> + Send;

    /// Enable notifications on the characteristic owning `descriptor`.
    fn subscribe(
        &self,
        descriptor: &DescriptorRef,
    ) -> impl Future<Output = Result<(), btleplug::Error>> + Send;

    /// Disable notifications on the characteristic owning `descriptor`.
    fn unsubscribe(
        &self,
        descriptor: &DescriptorRef,
    ) -> impl Future<Output = Result<(), btleplug::Error>> + Send;

    fn write_descriptor(
        &self,
        descriptor: &DescriptorRef,
        value: &[u8],
    ) -> impl Future<Output = Result<(), btleplug::Error>> + Send;

    fn notifications(&self) -> impl Future<Output = Result<Notifications, btleplug::Error>> + Send;
}

impl GattLink for Peripheral {
    fn connect(&self) -> impl Future<Output = Result<(), btleplug::Error>> + Send {
        api::Peripheral::connect(self)
    }

    fn disconnect(&self) -> impl Future<Output = Result<(), btleplug::Error>> + Send {
        api::Peripheral::disconnect(self)
    }

    fn is_connected(&self) -> impl Future<Output = Result<bool, btleplug::Error>> + Send {
        api::Peripheral::is_connected(self)
    }

    fn discover_services(
        &self,
    ) -> impl Future<Output = Result<Vec<ServiceDescriptor>, btleplug::Error>> + Send {
        async move {
            api::Peripheral::discover_services(self).await?;
            Ok(gatt::services(self))
        }
    }

    fn write(
        &self,
        characteristic: &CharacteristicDescriptor,
        value: &[u8],
        write_type: WriteType,
    ) -> impl Future<Output = Result<(), btleplug::Error>> + Send {
        async move {
            let native = gatt::find_characteristic(self, characteristic)
                .ok_or(btleplug::Error::NoSuchCharacteristic)?;
            api::Peripheral::write(self, &native, value, native_write_type(write_type)).await
        }
    }

    fn read(
        &self,
        characteristic: &CharacteristicDescriptor,
    ) -> impl Future<Output = Result<Vec<u8>, btleplug::Error>> + Send {
        async move {
            let native = gatt::find_characteristic(self, characteristic)
                .ok_or(btleplug::Error::NoSuchCharacteristic)?;
            api::Peripheral::read(self, &native).await
        }
    }

    fn subscribe(
        &self,
        descriptor: &DescriptorRef,
    ) -> impl Future<Output = Result<(), btleplug::Error>> + Send {
        async move {
            let owner =
                gatt::find_owner(self, descriptor).ok_or(btleplug::Error::NoSuchCharacteristic)?;
            api::Peripheral::subscribe(self, &owner).await
        }
    }

    fn unsubscribe(
        &self,
        descriptor: &DescriptorRef,
    ) -> impl Future<Output = Result<(), btleplug::Error>> + Send {
        async move {
            let owner =
                gatt::find_owner(self, descriptor).ok_or(btleplug::Error::NoSuchCharacteristic)?;
            api::Peripheral::unsubscribe(self, &owner).await
        }
    }

    fn write_descriptor(
        &self,
        descriptor: &DescriptorRef,
        value: &[u8],
    ) -> impl Future<Output = Result<(), btleplug::Error>> + Send {
        async move {
            api::Peripheral::write_descriptor(self, &gatt::descriptor(descriptor), value).await
        }
    }

    fn notifications(&self) -> impl Future<Output = Result<Notifications, btleplug::Error>> + Send {
        api::Peripheral::notifications(self)
    }
}

fn native_write_type(write_type: WriteType) -> api::WriteType {
    match write_type {
        WriteType::WithResponse => api::WriteType::WithResponse,
        WriteType::WithoutResponse => api::WriteType::WithoutResponse,
    }
}
