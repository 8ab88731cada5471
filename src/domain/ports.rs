//! Capabilities the bridge depends on.
//!
//! The radio and the vendor protocol are implemented over btleplug in
//! `infrastructure::bluetooth`; the event sink is whatever consumes the
//! published devices and readings.

#![allow(async_fn_in_trait)]

use crate::domain::error::BridgeError;
use crate::domain::models::{
    BridgeEvent, PeripheralId, RadioState, Reading, ScanRequest, SensorKind,
    VirtualDeviceDescriptor,
};
use tokio::sync::mpsc;

/// Discovery side of the BLE stack
pub trait Radio {
    type Link: SensorLink;

    /// Current readiness of the adapter
    async fn state(&self) -> Result<RadioState, BridgeError>;

    /// Begin scanning; discoveries arrive on the radio event channel
    async fn start_scanning(&self, request: &ScanRequest) -> Result<(), BridgeError>;

    /// Instantiate the vendor protocol for a discovered peripheral
    async fn link(&self, id: &PeripheralId) -> Result<Self::Link, BridgeError>;
}

/// Vendor protocol over one physical connection
pub trait SensorLink {
    async fn connect(&mut self) -> Result<(), BridgeError>;

    async fn discover_services(&mut self) -> Result<(), BridgeError>;

    async fn read_serial_number(&mut self) -> Result<String, BridgeError>;

    async fn read(&mut self, kind: SensorKind) -> Result<f64, BridgeError>;

    async fn disconnect(&mut self) -> Result<(), BridgeError>;
}

/// Receiver of virtual device registrations and readings
pub trait EventSink {
    fn register(&mut self, device: &VirtualDeviceDescriptor);

    fn data(&mut self, reading: &Reading);
}

impl EventSink for mpsc::UnboundedSender<BridgeEvent> {
    fn register(&mut self, device: &VirtualDeviceDescriptor) {
        let _ = self.send(BridgeEvent::Register(device.clone()));
    }

    fn data(&mut self, reading: &Reading) {
        let _ = self.send(BridgeEvent::Data(reading.clone()));
    }
}
