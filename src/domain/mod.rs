pub mod bridge;
pub mod debounce;
pub mod error;
pub mod models;
pub mod ports;
pub mod registry;
pub mod scan_guard;
pub mod sequencer;
pub mod settings;

#[cfg(test)]
pub mod testing;
