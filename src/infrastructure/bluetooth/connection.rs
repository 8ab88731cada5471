//! BLE Connection Module
//!
//! The Flower Power protocol over one btleplug peripheral.

use crate::domain::error::BridgeError;
use crate::domain::models::SensorKind;
use crate::domain::ports::SensorLink;
use crate::infrastructure::bluetooth::protocol;
use btleplug::api::{Characteristic, Peripheral as _};
use btleplug::platform::Peripheral;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Flower Power sensor reached through a btleplug peripheral
pub struct FlowerPowerLink {
    peripheral: Peripheral,
    service_discovery_delay: Duration,
}

impl FlowerPowerLink {
    pub fn new(peripheral: Peripheral, service_discovery_delay: Duration) -> Self {
        Self {
            peripheral,
            service_discovery_delay,
        }
    }

    /// Find a characteristic among those found by service discovery
    fn find_characteristic(&self, uuid: Uuid) -> Result<Characteristic, BridgeError> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or(BridgeError::CharacteristicNotFound { uuid })
    }

    async fn read_characteristic(&self, uuid: Uuid) -> Result<Vec<u8>, BridgeError> {
        let characteristic = self.find_characteristic(uuid)?;
        let bytes = self.peripheral.read(&characteristic).await?;
        debug!("Read {} bytes from {}", bytes.len(), uuid);
        Ok(bytes)
    }
}

impl SensorLink for FlowerPowerLink {
    async fn connect(&mut self) -> Result<(), BridgeError> {
        self.peripheral.connect().await?;
        info!("Connected to {}", self.peripheral.id());
        Ok(())
    }

    async fn discover_services(&mut self) -> Result<(), BridgeError> {
        // BlueZ reports the connection before the remote GATT cache is
        // populated; discovering too early returns an empty set.
        if cfg!(target_os = "linux") {
            tokio::time::sleep(self.service_discovery_delay).await;
        }

        self.peripheral.discover_services().await?;
        let services: Vec<Uuid> = self.peripheral.services().iter().map(|s| s.uuid).collect();
        info!(
            "Got {} services, {} characteristics",
            services.len(),
            self.peripheral.characteristics().len()
        );
        protocol::require_live_service(&services)
    }

    async fn read_serial_number(&mut self) -> Result<String, BridgeError> {
        let bytes = self.read_characteristic(protocol::SERIAL_NUMBER_UUID).await?;
        protocol::parse_serial_number(&bytes)
    }

    async fn read(&mut self, kind: SensorKind) -> Result<f64, BridgeError> {
        let bytes = self
            .read_characteristic(protocol::characteristic_for(kind))
            .await?;
        protocol::decode(kind, &bytes)
    }

    async fn disconnect(&mut self) -> Result<(), BridgeError> {
        self.peripheral.disconnect().await?;
        info!("Disconnected from {}", self.peripheral.id());
        Ok(())
    }
}
