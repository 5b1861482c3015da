//! Mapping of btleplug results onto GATT status codes.

use volv0x_domain::gatt::GattStatus;

/// GATT status reported for a failed btleplug call.
pub(crate) fn status_of(err: &btleplug::Error) -> GattStatus {
    match err {
        btleplug::Error::NotSupported(_) => GattStatus::REQUEST_NOT_SUPPORTED,
        btleplug::Error::NotConnected
        | btleplug::Error::DeviceNotFound
        | btleplug::Error::TimedOut(_) => GattStatus::FAILURE,
        _ => GattStatus::ERROR,
    }
}

/// Status of a completed call, logging the failure.
pub(crate) fn status_from<T>(operation: &'static str, result: &Result<T, btleplug::Error>) -> GattStatus {
    match result {
        Ok(_) => GattStatus::SUCCESS,
        Err(err) => {
            tracing::debug!(%err, operation, "btleplug call failed");
            status_of(err)
        }
    }
}
