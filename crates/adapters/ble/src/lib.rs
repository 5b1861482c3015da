//! # volv0x-adapter-ble
//!
//! btleplug-backed BLE adapter — finds the peripheral and implements the
//! [`Transport`](volv0x_app::ports::Transport) port on top of it.
//!
//! ## How it works
//!
//! [`scanner::find_peripheral`] runs a single scan until the configured
//! address (or local name) shows up. The resulting peripheral is registered
//! with a [`BtleplugTransport`], which then serves `open` / `close` /
//! discovery / read / write commands on per-handle worker tasks and reports
//! completions as transport events.
//!
//! ## Platform gaps
//!
//! | Operation | btleplug | Reported as |
//! |-----------|----------|-------------|
//! | MTU request | not exposed | `MtuChanged { mtu: 23, status: 0x0006 }` |
//! | CCCD write | `subscribe` / `unsubscribe` | no completion event |
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `volv0x-app` and `volv0x-domain`.

mod config;
mod error;
mod gatt;
mod link;
pub mod scanner;
mod status;
mod transport;
mod worker;

pub use config::BleConfig;
pub use error::BleError;
pub use transport::BtleplugTransport;
