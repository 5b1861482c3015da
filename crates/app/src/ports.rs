//! Port definitions — the traits the connection core talks through.
//!
//! [`Transport`] is driven by the router; [`StateObserver`] and
//! [`AlertNotifier`] are fed by it. Adapters implement them, the core never
//! names a concrete BLE stack or notification backend.

pub mod notifier;
pub mod observer;
pub mod transport;

pub use notifier::{AlertNotifier, NotifierError};
pub use observer::StateObserver;
pub use transport::Transport;
