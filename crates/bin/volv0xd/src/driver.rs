//! Drives the session from its own snapshots: MTU and discovery after each
//! connect, then one greeting once notifications are enabled.

use tokio::sync::broadcast;

use volv0x_app::session::{SessionClosed, SessionHandle};
use volv0x_domain::connection::ConnectionState;

/// What the driver does on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    pub mtu: Option<u16>,
    pub greet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    RequestMtu(u16),
    Discover,
    WriteGreeting,
}

impl Step {
    async fn send(self, session: &SessionHandle) -> Result<(), SessionClosed> {
        match self {
            Self::RequestMtu(size) => session.request_mtu(size).await,
            Self::Discover => session.discover().await,
            Self::WriteGreeting => session.write_greeting().await,
        }
    }
}

/// Requests implied by moving from `previous` to `next`.
#[must_use]
pub fn plan(previous: &ConnectionState, next: &ConnectionState, config: &DriverConfig) -> Vec<Step> {
    let mut steps = Vec::new();

    if next.is_connected() && !previous.is_connected() {
        if let Some(mtu) = config.mtu {
            steps.push(Step::RequestMtu(mtu));
        }
        steps.push(Step::Discover);
    }

    if config.greet && next.notification_armed && !previous.notification_armed {
        steps.push(Step::WriteGreeting);
    }

    steps
}

/// Follow `snapshots` until the bus closes or the session stops accepting
/// requests.
pub async fn run(
    config: DriverConfig,
    session: SessionHandle,
    mut snapshots: broadcast::Receiver<ConnectionState>,
) {
    let mut previous = ConnectionState::initial();
    loop {
        let next = match snapshots.recv().await {
            Ok(state) => state,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "driver lagged behind connection snapshots");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        for step in plan(&previous, &next, &config) {
            tracing::debug!(?step, "driver step");
            if step.send(&session).await.is_err() {
                return;
            }
        }
        previous = next;
    }
}
