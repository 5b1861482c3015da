//! GATT vocabulary — status codes, operations and the service layout a
//! peripheral exposes.
//!
//! Descriptors are produced by the transport adapter after discovery and
//! shared with connection snapshots through an `Arc`; the core never
//! mutates them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The Bluetooth SIG base UUID (`0000xxxx-0000-1000-8000-00805F9B34FB`).
const BLUETOOTH_BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5F9B_34FB;

/// Expand a 16-bit SIG-assigned number into its 128-bit UUID.
#[must_use]
pub const fn uuid_from_u16(short: u16) -> uuid::Uuid {
    uuid::Uuid::from_u128(BLUETOOTH_BASE_UUID | ((short as u128) << 96))
}

/// Client Characteristic Configuration Descriptor.
pub const CCCD_UUID: uuid::Uuid = uuid_from_u16(0x2902);

/// Value written to the CCCD to enable notifications.
pub const ENABLE_NOTIFICATION_VALUE: [u8; 2] = [0x01, 0x00];

/// Default ATT MTU before any negotiation.
pub const DEFAULT_ATT_MTU: u16 = 23;

/// Largest ATT MTU a client may request.
pub const MAX_ATT_MTU: u16 = 517;

/// Status code reported by the transport for a completed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GattStatus(u16);

impl GattStatus {
    pub const SUCCESS: Self = Self(0x0000);
    pub const REQUEST_NOT_SUPPORTED: Self = Self(0x0006);
    pub const ERROR: Self = Self(0x0085);
    pub const FAILURE: Self = Self(0x0101);

    /// Wrap a raw status code.
    #[must_use]
    pub const fn from_code(code: u16) -> Self {
        Self(code)
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == Self::SUCCESS.0
    }

    fn name(self) -> Option<&'static str> {
        match self {
            Self::SUCCESS => Some("success"),
            Self::REQUEST_NOT_SUPPORTED => Some("request not supported"),
            Self::ERROR => Some("error"),
            Self::FAILURE => Some("failure"),
            _ => None,
        }
    }
}

impl fmt::Display for GattStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "0x{:04X} ({name})", self.0),
            None => write!(f, "0x{:04X}", self.0),
        }
    }
}

/// Transport operations whose completion carries a [`GattStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GattOperation {
    Connect,
    RequestMtu,
    DiscoverServices,
    WriteCharacteristic,
    ReadCharacteristic,
}

impl fmt::Display for GattOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => f.write_str("connection"),
            Self::RequestMtu => f.write_str("MTU request"),
            Self::DiscoverServices => f.write_str("service discovery"),
            Self::WriteCharacteristic => f.write_str("characteristic write"),
            Self::ReadCharacteristic => f.write_str("characteristic read"),
        }
    }
}

/// How a characteristic write is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteType {
    #[default]
    WithResponse,
    WithoutResponse,
}

/// Capability flags of a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct CharacteristicProperties {
    pub read: bool,
    pub write: bool,
    pub write_without_response: bool,
    pub notify: bool,
    pub indicate: bool,
}

/// A characteristic discovered on the peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacteristicDescriptor {
    pub uuid: uuid::Uuid,
    /// The service this characteristic belongs to.
    pub service_uuid: uuid::Uuid,
    pub properties: CharacteristicProperties,
    /// UUIDs of the descriptors attached to this characteristic.
    pub descriptors: Vec<uuid::Uuid>,
}

/// A service discovered on the peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub uuid: uuid::Uuid,
    pub primary: bool,
    pub characteristics: Vec<CharacteristicDescriptor>,
}

impl ServiceDescriptor {
    /// Look up a characteristic of this service by UUID.
    #[must_use]
    pub fn characteristic(&self, uuid: uuid::Uuid) -> Option<&CharacteristicDescriptor> {
        self.characteristics.iter().find(|c| c.uuid == uuid)
    }
}

/// Address of a descriptor to write (e.g. the CCCD of a characteristic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorRef {
    pub service_uuid: uuid::Uuid,
    pub characteristic_uuid: uuid::Uuid,
    pub uuid: uuid::Uuid,
}

impl DescriptorRef {
    /// The CCCD of `characteristic`.
    #[must_use]
    pub fn cccd(characteristic: &CharacteristicDescriptor) -> Self {
        Self {
            service_uuid: characteristic.service_uuid,
            characteristic_uuid: characteristic.uuid,
            uuid: CCCD_UUID,
        }
    }
}

/// Service + characteristic pair shared with the peripheral firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GattTarget {
    pub service: uuid::Uuid,
    pub characteristic: uuid::Uuid,
}

impl GattTarget {
    /// Service exposed by the proximity patch firmware.
    pub const DEFAULT_SERVICE: uuid::Uuid = uuid_from_u16(0x2222);
    /// Telemetry characteristic (read / write / notify).
    pub const DEFAULT_CHARACTERISTIC: uuid::Uuid = uuid_from_u16(0x1111);

    /// Parse a target from textual UUIDs.
    ///
    /// Any canonical 128-bit form is accepted, regardless of case.
    ///
    /// # Errors
    ///
    /// Returns [`uuid::Error`] when either string is not a valid UUID.
    pub fn parse(service: &str, characteristic: &str) -> Result<Self, uuid::Error> {
        Ok(Self {
            service: uuid::Uuid::from_str(service.trim())?,
            characteristic: uuid::Uuid::from_str(characteristic.trim())?,
        })
    }

    /// Locate the target characteristic in a discovered service list.
    #[must_use]
    pub fn find<'a>(&self, services: &'a [ServiceDescriptor]) -> Option<&'a CharacteristicDescriptor> {
        services
            .iter()
            .filter(|s| s.uuid == self.service)
            .find_map(|s| s.characteristic(self.characteristic))
    }
}

impl Default for GattTarget {
    fn default() -> Self {
        Self {
            service: Self::DEFAULT_SERVICE,
            characteristic: Self::DEFAULT_CHARACTERISTIC,
        }
    }
}
