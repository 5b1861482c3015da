//! Telemetry payload codec.
//!
//! The peripheral pushes (or serves on read) a fixed header followed by
//! optional bytes that newer firmware may append:
//!
//! | Offset | Field | Type |
//! |--------|-------|------|
//! | 0–1 | Distance | u16, millimetres |
//! | 2–3 | Battery voltage | u16, millivolts (A2 pin) |
//! | 4.. | Reserved | ignored |
//!
//! Both fields use the same fixed byte order, which is part of the firmware
//! contract and therefore configured rather than detected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PayloadError;

/// Length of the distance + battery header.
pub const PAYLOAD_HEADER_LEN: usize = 4;

/// Byte order of the 16-bit payload fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

impl ByteOrder {
    fn read_u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            Self::BigEndian => u16::from_be_bytes(bytes),
            Self::LittleEndian => u16::from_le_bytes(bytes),
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BigEndian => f.write_str("big_endian"),
            Self::LittleEndian => f.write_str("little_endian"),
        }
    }
}

/// Error returned when a byte order name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown byte order {0:?}, expected \"big_endian\" or \"little_endian\"")]
pub struct UnknownByteOrder(pub String);

impl FromStr for ByteOrder {
    type Err = UnknownByteOrder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "big_endian" | "big" | "be" => Ok(Self::BigEndian),
            "little_endian" | "little" | "le" => Ok(Self::LittleEndian),
            other => Err(UnknownByteOrder(other.to_owned())),
        }
    }
}

/// One decoded telemetry sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Distance to the closest object, in millimetres.
    pub distance_millimeters: u16,
    /// Battery voltage, in millivolts.
    pub battery_millivolts: u16,
}

/// Decodes raw notification / read values into [`SensorReading`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PayloadCodec {
    order: ByteOrder,
}

impl PayloadCodec {
    #[must_use]
    pub const fn new(order: ByteOrder) -> Self {
        Self { order }
    }

    #[must_use]
    pub const fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Decode the first four bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Malformed`] when fewer than four bytes are
    /// present.
    pub fn decode(&self, bytes: &[u8]) -> Result<SensorReading, PayloadError> {
        let &[d0, d1, b0, b1, ..] = bytes else {
            return Err(PayloadError::Malformed {
                expected: PAYLOAD_HEADER_LEN,
                actual: bytes.len(),
            });
        };

        Ok(SensorReading {
            distance_millimeters: self.order.read_u16([d0, d1]),
            battery_millivolts: self.order.read_u16([b0, b1]),
        })
    }
}
