//! Bluetooth Service Module
//!
//! Main service that owns the adapter, scanning and per-peripheral links.

use crate::domain::error::BridgeError;
use crate::domain::models::{PeripheralId, RadioEvent, RadioState, ScanRequest};
use crate::domain::ports::Radio;
use crate::infrastructure::bluetooth::{
    connection::FlowerPowerLink,
    scanner::{self, BleScanner, KnownPeripherals},
};
use btleplug::api::{Central, Manager as _};
use btleplug::platform::{Adapter, Manager};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// Main Bluetooth service coordinating all BLE operations
pub struct BluetoothService {
    adapter: Adapter,
    scanner: BleScanner,
    known: KnownPeripherals,
    service_discovery_delay: Duration,
}

impl BluetoothService {
    /// Open the first adapter and start listening for its events.
    ///
    /// Returns the service together with the channel radio events arrive on.
    pub async fn new(
        service_discovery_delay: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<RadioEvent>), BridgeError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(BridgeError::NoAdapter)?;
        info!("Using adapter {}", adapter.adapter_info().await?);

        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        let known = KnownPeripherals::default();
        let mut scanner = BleScanner::new(adapter.clone(), event_sender, known.clone());
        scanner.listen().await?;

        let service = Self {
            adapter,
            scanner,
            known,
            service_discovery_delay,
        };
        Ok((service, event_receiver))
    }
}

impl Radio for BluetoothService {
    type Link = FlowerPowerLink;

    async fn state(&self) -> Result<RadioState, BridgeError> {
        let state = self.adapter.adapter_state().await?;
        Ok(scanner::radio_state(state))
    }

    async fn start_scanning(&self, request: &ScanRequest) -> Result<(), BridgeError> {
        self.scanner.start(request).await
    }

    async fn link(&self, id: &PeripheralId) -> Result<FlowerPowerLink, BridgeError> {
        let platform_id = self
            .known
            .lock()
            .map_err(|_| BridgeError::Radio("Lock error".to_string()))?
            .get(id)
            .cloned()
            .ok_or_else(|| BridgeError::UnknownPeripheral(id.clone()))?;

        let peripheral = self.adapter.peripheral(&platform_id).await?;
        Ok(FlowerPowerLink::new(peripheral, self.service_discovery_delay))
    }
}
