//! Proximity alerting — turns connection snapshots into user-facing alerts.
//!
//! Every snapshot is classified into an [`AlertTier`]. While the object is
//! closer than [`NOTIFY_BELOW_MILLIMETERS`] (and the reading is not zero) a
//! "too close" alert is posted through the [`AlertNotifier`] port; once it
//! moves away, the alert is cancelled.

use std::fmt;

use tokio::sync::broadcast;

use volv0x_domain::alert::{self, AlertTier};
use volv0x_domain::connection::ConnectionState;

use crate::ports::{AlertNotifier, NotifierError};

/// Distances below this (and above zero) raise a "too close" alert.
pub const NOTIFY_BELOW_MILLIMETERS: u16 = 800;

/// Urgency of the notification channel for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    High,
    Default,
    Low,
    Min,
    None,
}

/// Light / accent colour associated with a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertColor {
    Red,
    Magenta,
    Black,
}

impl fmt::Display for AlertColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => f.write_str("red"),
            Self::Magenta => f.write_str("magenta"),
            Self::Black => f.write_str("black"),
        }
    }
}

/// How a tier is presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPresentation {
    pub urgency: Urgency,
    pub color: AlertColor,
}

/// Presentation of each tier.
#[must_use]
pub fn presentation(tier: AlertTier) -> AlertPresentation {
    let (urgency, color) = match tier {
        AlertTier::Critical => (Urgency::High, AlertColor::Red),
        AlertTier::High => (Urgency::Default, AlertColor::Magenta),
        AlertTier::Medium => (Urgency::Low, AlertColor::Black),
        AlertTier::Low => (Urgency::Min, AlertColor::Black),
        AlertTier::None => (Urgency::None, AlertColor::Black),
    };
    AlertPresentation { urgency, color }
}

/// A "too close" alert ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProximityAlert {
    pub distance_millimeters: u16,
    pub tier: AlertTier,
    pub presentation: AlertPresentation,
}

impl ProximityAlert {
    #[must_use]
    pub fn new(distance_millimeters: u16) -> Self {
        let tier = alert::classify(distance_millimeters);
        Self {
            distance_millimeters,
            tier,
            presentation: presentation(tier),
        }
    }

    #[must_use]
    pub fn title(&self) -> String {
        format!("DIST: {} mm", self.distance_millimeters)
    }

    #[must_use]
    pub fn body(&self) -> String {
        format!("{} mm object too close", self.distance_millimeters)
    }
}

/// What [`AlertService::on_snapshot`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertOutcome {
    Posted(ProximityAlert),
    Cancelled,
    Unchanged,
}

/// Reacts to connection snapshots by posting or cancelling the alert.
pub struct AlertService<N> {
    notifier: N,
    showing: bool,
}

impl<N: AlertNotifier> AlertService<N> {
    pub fn new(notifier: N) -> Self {
        Self {
            notifier,
            showing: false,
        }
    }

    /// Apply one snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`NotifierError`] when the notifier fails to post or cancel.
    pub async fn on_snapshot(
        &mut self,
        state: &ConnectionState,
    ) -> Result<AlertOutcome, NotifierError> {
        let distance = state.effective_distance();
        if distance > 0 && distance < NOTIFY_BELOW_MILLIMETERS {
            let alert = ProximityAlert::new(distance);
            self.notifier.post(&alert).await?;
            self.showing = true;
            return Ok(AlertOutcome::Posted(alert));
        }

        if self.showing {
            self.notifier.cancel().await?;
            self.showing = false;
            return Ok(AlertOutcome::Cancelled);
        }

        Ok(AlertOutcome::Unchanged)
    }

    /// Consume snapshots until the bus closes, then cancel any alert left.
    pub async fn run(mut self, mut snapshots: broadcast::Receiver<ConnectionState>) {
        loop {
            match snapshots.recv().await {
                Ok(state) => match self.on_snapshot(&state).await {
                    Ok(AlertOutcome::Posted(alert)) => tracing::debug!(
                        distance_mm = alert.distance_millimeters,
                        tier = %alert.tier,
                        "proximity alert posted"
                    ),
                    Ok(AlertOutcome::Cancelled) => tracing::debug!("proximity alert cancelled"),
                    Ok(AlertOutcome::Unchanged) => {}
                    Err(err) => tracing::warn!(%err, "failed to update proximity alert"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "alerting lagged behind connection snapshots");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        if self.showing
            && let Err(err) = self.notifier.cancel().await
        {
            tracing::warn!(%err, "failed to cancel proximity alert");
        }
    }
}
