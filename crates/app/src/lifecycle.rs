//! Lifecycle binding — ties the transport handle to the visibility of the
//! owning scope.
//!
//! The host (a GUI shell, a daemon reacting to signals, …) calls
//! [`on_foreground`](LifecycleBinder::on_foreground),
//! [`on_background`](LifecycleBinder::on_background) and finally
//! [`on_teardown`](LifecycleBinder::on_teardown). Teardown also runs when the
//! binder is dropped, so the handle is released on every exit path.

use std::fmt;

use volv0x_domain::id::PeripheralId;

use crate::ports::Transport;
use crate::router::{GattEventRouter, RouterConfig};

/// Where the owning scope currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Created,
    Foreground,
    Background,
    TornDown,
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Foreground => f.write_str("foreground"),
            Self::Background => f.write_str("background"),
            Self::TornDown => f.write_str("torn down"),
        }
    }
}

/// Owns the [`GattEventRouter`] of the selected peripheral and acquires or
/// releases its transport handle as the owning scope comes and goes.
///
/// At most one transport handle exists at any time: the router reuses the
/// registered handle instead of opening a second one.
pub struct LifecycleBinder<T: Transport> {
    router: GattEventRouter<T>,
    stage: LifecycleStage,
}

impl<T: Transport> LifecycleBinder<T> {
    /// Bind a new router for `peripheral` to this lifecycle.
    pub fn new(transport: T, peripheral: PeripheralId, config: RouterConfig) -> Self {
        Self {
            router: GattEventRouter::new(transport, peripheral, config),
            stage: LifecycleStage::Created,
        }
    }

    #[must_use]
    pub fn stage(&self) -> LifecycleStage {
        self.stage
    }

    #[must_use]
    pub fn router(&self) -> &GattEventRouter<T> {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut GattEventRouter<T> {
        &mut self.router
    }

    /// The owning scope became visible: resume the suspended link, or open
    /// a new handle if none is registered yet.
    pub fn on_foreground(&mut self) {
        if self.stage == LifecycleStage::TornDown {
            tracing::warn!("foreground after teardown ignored");
            return;
        }
        tracing::debug!(from = %self.stage, "entering foreground");
        self.stage = LifecycleStage::Foreground;
        self.router.connect();
    }

    /// The owning scope is no longer visible: close the link but keep the
    /// handle. Discovered services are stale after resuming and discovery
    /// is not re-triggered here.
    pub fn on_background(&mut self) {
        if self.stage == LifecycleStage::TornDown {
            return;
        }
        tracing::debug!(from = %self.stage, "entering background");
        self.stage = LifecycleStage::Background;
        self.router.disconnect();
    }

    /// The owning scope ended: disconnect, release the handle and reset the
    /// snapshot. Safe to call more than once.
    pub fn on_teardown(&mut self) {
        if self.stage == LifecycleStage::TornDown {
            return;
        }
        self.stage = LifecycleStage::TornDown;
        if !self.router.release() {
            tracing::debug!("teardown without transport handle");
        }
    }
}

impl<T: Transport> Drop for LifecycleBinder<T> {
    fn drop(&mut self) {
        self.on_teardown();
    }
}
