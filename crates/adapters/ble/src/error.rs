//! BLE adapter error types.

/// Errors raised while setting up the BLE link.
///
/// Once a [`BtleplugTransport`](crate::BtleplugTransport) is running, failures
/// are no longer returned: they travel as GATT statuses inside transport
/// events.
#[derive(Debug, thiserror::Error)]
pub enum BleError {
    /// No BLE adapter found on the host.
    #[error("no BLE adapter available")]
    NotAvailable,

    /// BLE scan or adapter operation failed.
    #[error("BLE scan error")]
    Scan(#[from] btleplug::Error),

    /// The scan finished without seeing the requested peripheral.
    #[error("peripheral {selector} not found after {scanned_secs}s scan")]
    PeripheralNotFound {
        /// Address or name that was searched for.
        selector: String,
        /// Scan duration in seconds.
        scanned_secs: u16,
    },
}
