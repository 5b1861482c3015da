//! Alert notifier port — the system-tray / notification integration.

use std::future::Future;

use crate::alerting::ProximityAlert;

/// Failure reported by a notifier implementation.
#[derive(Debug, thiserror::Error)]
#[error("alert notifier failed")]
pub struct NotifierError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

/// Shows and hides the user-facing proximity alert.
pub trait AlertNotifier {
    /// Show (or replace) the proximity alert.
    fn post(&self, alert: &ProximityAlert) -> impl Future<Output = Result<(), NotifierError>> + Send;

    /// Remove any alert currently shown.
    fn cancel(&self) -> impl Future<Output = Result<(), NotifierError>> + Send;
}
