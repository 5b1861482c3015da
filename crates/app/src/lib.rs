//! # volv0x-app
//!
//! Application layer — the connection state machine and the **port
//! definitions** (traits) it drives.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `Transport` — fire-and-forget GATT commands against one peripheral
//!   - `StateObserver` — receives every published `ConnectionState`
//!   - `AlertNotifier` — shows and hides the proximity alert
//! - Fold transport events into `ConnectionState` (`router`)
//! - Bind a host lifecycle to connect / disconnect / release (`lifecycle`)
//! - Serialize events and consumer requests on one task (`session`)
//! - Fan snapshots out to subscribers (`snapshot_bus`) and alert on them (`alerting`)
//!
//! ## Dependency rule
//! Depends on `volv0x-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod alerting;
pub mod lifecycle;
pub mod ports;
pub mod router;
pub mod session;
pub mod snapshot_bus;

#[cfg(test)]
mod testing;
