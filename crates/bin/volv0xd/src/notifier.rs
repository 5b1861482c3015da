//! Alert notifier that writes to the log instead of a desktop tray.

use std::future::Future;

use volv0x_app::alerting::{ProximityAlert, Urgency};
use volv0x_app::ports::{AlertNotifier, NotifierError};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl AlertNotifier for LogNotifier {
    fn post(&self, alert: &ProximityAlert) -> impl Future<Output = Result<(), NotifierError>> + Send {
        let title = alert.title();
        let body = alert.body();
        let color = alert.presentation.color;
        match alert.presentation.urgency {
            Urgency::High => tracing::error!(%title, %color, "{body}"),
            Urgency::Default => tracing::warn!(%title, %color, "{body}"),
            Urgency::Low | Urgency::Min | Urgency::None => tracing::info!(%title, %color, "{body}"),
        }
        async { Ok(()) }
    }

    fn cancel(&self) -> impl Future<Output = Result<(), NotifierError>> + Send {
        tracing::info!("proximity alert cleared");
        async { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_accept_post_and_cancel() {
        let notifier = LogNotifier;
        assert!(notifier.post(&ProximityAlert::new(250)).await.is_ok());
        assert!(notifier.cancel().await.is_ok());
    }
}
