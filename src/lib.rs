//! Polling bridge between Parrot Flower Power plant sensors and an
//! event-consuming application.
//!
//! Sensors are discovered over BLE, throttled per peripheral, read one
//! connection at a time and republished as three virtual devices each
//! (temperature, light, soil moisture).

pub mod domain;
pub mod infrastructure;
