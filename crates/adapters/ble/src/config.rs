//! BLE adapter configuration.

use serde::Deserialize;

/// Which peripheral to look for and how long to scan for it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// MAC address of the peripheral (e.g. `"C4:7C:8D:6A:12:34"`).
    pub address: Option<String>,
    /// Advertised local name, used when no address is configured.
    pub name: Option<String>,
    /// How long to scan for the peripheral, in seconds.
    pub scan_duration_secs: u16,
    /// Buffer size of the transport event channel.
    pub event_capacity: usize,
}

impl BleConfig {
    /// Human-readable description of what the scanner looks for.
    #[must_use]
    pub fn selector(&self) -> String {
        match (&self.address, &self.name) {
            (Some(address), _) => address.clone(),
            (None, Some(name)) => format!("\"{name}\""),
            (None, None) => "<unset>".to_owned(),
        }
    }

    /// Whether an advertised peripheral is the one configured.
    ///
    /// The address wins when both are set; comparison is case-insensitive
    /// for addresses and exact for names.
    #[must_use]
    pub fn matches(&self, address: &str, local_name: Option<&str>) -> bool {
        match (&self.address, &self.name) {
            (Some(wanted), _) => wanted.eq_ignore_ascii_case(address),
            (None, Some(wanted)) => local_name == Some(wanted.as_str()),
            (None, None) => false,
        }
    }
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            address: None,
            name: None,
            scan_duration_secs: 10,
            event_capacity: 64,
        }
    }
}
