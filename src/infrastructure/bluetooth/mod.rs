//! Bluetooth Module
//!
//! btleplug implementation of the radio and Flower Power protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    BluetoothService                      │
//! │        (implements Radio - adapter state, links)         │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼─────────────┐
//!         │             │             │
//!         ▼             ▼             ▼
//! ┌───────────┐  ┌────────────┐  ┌──────────┐
//! │  Scanner  │  │ Connection │  │ Protocol │
//! │           │  │            │  │          │
//! │ - scan    │  │ - GATT     │  │ - UUIDs  │
//! │ - events  │  │   reads    │  │ - values │
//! └───────────┘  └────────────┘  └──────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Flower Power GATT layout and value conversions
//! - [`scanner`] - BLE scanning and adapter event forwarding
//! - [`connection`] - Per-peripheral link implementing the sensor protocol
//! - [`service`] - Main service coordinator

pub mod connection;
pub mod protocol;
pub mod scanner;
pub mod service;

use crate::domain::error::BridgeError;

// Re-export main service for convenience
pub use service::BluetoothService;

impl From<btleplug::Error> for BridgeError {
    fn from(error: btleplug::Error) -> Self {
        BridgeError::Radio(error.to_string())
    }
}
