//! # volv0x-domain
//!
//! Pure domain model for the volv0x BLE proximity client.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Describe the **GATT layout** a peripheral exposes (services, characteristics)
//! - Define the **connection snapshot** ([`ConnectionState`](connection::ConnectionState))
//!   that is replaced wholesale on every transport event
//! - Define the **transport events** delivered by the BLE stack
//! - Decode the **telemetry payload** (distance + battery) and classify
//!   distances into **alert tiers**
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod alert;
pub mod connection;
pub mod event;
pub mod gatt;
pub mod payload;
