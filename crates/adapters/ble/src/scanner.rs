//! One-shot scanner — finds the configured peripheral before the session starts.

use std::time::Duration;

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio_stream::StreamExt as _;

use crate::config::BleConfig;
use crate::error::BleError;

/// First Bluetooth adapter of the host.
///
/// # Errors
///
/// Returns [`BleError::NotAvailable`] when the host has no adapter, or
/// [`BleError::Scan`] when the BLE manager cannot be created.
pub async fn default_adapter() -> Result<Adapter, BleError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters.into_iter().next().ok_or(BleError::NotAvailable)
}

/// Scan until a peripheral matching `config` is seen.
///
/// The scan stops as soon as the peripheral is found or after
/// `scan_duration_secs`, whichever comes first.
///
/// # Errors
///
/// Returns [`BleError::PeripheralNotFound`] when nothing matched within the
/// scan window, or [`BleError::Scan`] when the scan cannot be started.
pub async fn find_peripheral(central: &Adapter, config: &BleConfig) -> Result<Peripheral, BleError> {
    let mut events = central.events().await?;
    central.start_scan(ScanFilter::default()).await?;

    tracing::info!(
        selector = %config.selector(),
        duration_secs = config.scan_duration_secs,
        "BLE scan started"
    );

    let deadline =
        tokio::time::Instant::now() + Duration::from_secs(u64::from(config.scan_duration_secs));
    let mut found = None;

    while tokio::time::Instant::now() < deadline {
        let remaining = deadline - tokio::time::Instant::now();
        match tokio::time::timeout(remaining, events.next()).await {
            Ok(Some(CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id))) => {
                let Ok(peripheral) = central.peripheral(&id).await else {
                    continue;
                };
                let Ok(Some(props)) = peripheral.properties().await else {
                    continue;
                };

                let address = props.address.to_string();
                tracing::trace!(%address, name = ?props.local_name, rssi = ?props.rssi, "BLE device detected");
                if config.matches(&address, props.local_name.as_deref()) {
                    tracing::info!(%address, name = ?props.local_name, "peripheral found");
                    found = Some(peripheral);
                    break;
                }
            }
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => break,
        }
    }

    central.stop_scan().await?;

    found.ok_or_else(|| BleError::PeripheralNotFound {
        selector: config.selector(),
        scanned_secs: config.scan_duration_secs,
    })
}
