//! Typed identifiers for transport handles and peripherals.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one transport handle (one native GATT client object).
///
/// Every [`TransportEvent`](crate::event::TransportEvent) carries the id
/// of the handle it originates from, which lets the router discard
/// callbacks from handles that are no longer registered.
///
/// Ids are random and never reused across open / release cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(uuid::Uuid);

impl HandleId {
    /// Generate a new random handle id.
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Address of the remote peripheral (e.g. `"AA:BB:CC:DD:EE:FF"`).
///
/// Stored upper-cased so comparisons are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeripheralId(String);

impl PeripheralId {
    /// Build a peripheral id from an address string.
    #[must_use]
    pub fn new(address: impl AsRef<str>) -> Self {
        Self(address.as_ref().trim().to_ascii_uppercase())
    }

    /// The normalised address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `address` designates this peripheral, ignoring case.
    #[must_use]
    pub fn matches(&self, address: &str) -> bool {
        self.0.eq_ignore_ascii_case(address.trim())
    }
}

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
