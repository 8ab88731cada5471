//! BLE Scanner Module
//!
//! Starts filtered scans and turns adapter events into radio events for
//! the bridge.
//!
//! The OS filter passed to `start_scan` is advisory: BlueZ also reports
//! devices it already knows and other scans' results. Every sighting is
//! therefore checked against the active request's services before the
//! bridge hears about it.

use crate::domain::error::BridgeError;
use crate::domain::models::{PeripheralId, RadioEvent, RadioState, ScanRequest};
use btleplug::api::{Central, CentralEvent, CentralState, Peripheral as _, ScanFilter};
use btleplug::platform::{self, Adapter};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Peripherals seen so far, by the id the bridge knows them under
pub type KnownPeripherals = Arc<Mutex<HashMap<PeripheralId, platform::PeripheralId>>>;

/// Request of the scan in progress, `None` until one has started
type ActiveScan = Arc<Mutex<Option<ScanRequest>>>;

/// BLE Scanner for discovering Flower Power sensors
pub struct BleScanner {
    adapter: Adapter,
    event_sender: mpsc::UnboundedSender<RadioEvent>,
    known: KnownPeripherals,
    active: ActiveScan,
    forwarder: Option<JoinHandle<()>>,
}

impl BleScanner {
    /// Create a new scanner
    pub fn new(
        adapter: Adapter,
        event_sender: mpsc::UnboundedSender<RadioEvent>,
        known: KnownPeripherals,
    ) -> Self {
        Self {
            adapter,
            event_sender,
            known,
            active: ActiveScan::default(),
            forwarder: None,
        }
    }

    /// Subscribe to adapter events and forward them until the adapter stream ends
    pub async fn listen(&mut self) -> Result<(), BridgeError> {
        let mut events = self.adapter.events().await?;
        let adapter = self.adapter.clone();
        let sender = self.event_sender.clone();
        let known = self.known.clone();
        let active = self.active.clone();

        let handle = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let event = match classify(event) {
                    Some(Sighting::State(state)) => RadioEvent::StateChanged(state),
                    Some(Sighting::Device { id, repeat }) => {
                        let Some(request) = current(&active) else {
                            continue;
                        };
                        let services = advertised_services(&adapter, &id).await;
                        if !request.accepts(repeat, &services) {
                            trace!("Ignoring {} advertising {:?}", id, services);
                            continue;
                        }
                        RadioEvent::Discovered(remember(&known, id))
                    }
                    None => continue,
                };
                if sender.send(event).is_err() {
                    debug!("Bridge stopped listening, dropping adapter events");
                    break;
                }
            }
            info!("Adapter event stream ended");
        });

        self.forwarder = Some(handle);
        Ok(())
    }

    /// Start scanning for BLE devices
    pub async fn start(&self, request: &ScanRequest) -> Result<(), BridgeError> {
        set_active(&self.active, Some(request.clone()));

        info!("Scanning for Flower Power sensors...");
        let filter = ScanFilter {
            services: request.services.clone(),
        };
        if let Err(e) = self.adapter.start_scan(filter).await {
            set_active(&self.active, None);
            return Err(e.into());
        }
        Ok(())
    }
}

impl Drop for BleScanner {
    fn drop(&mut self) {
        if let Some(handle) = self.forwarder.take() {
            handle.abort();
        }
    }
}

pub fn radio_state(state: CentralState) -> RadioState {
    match state {
        CentralState::PoweredOn => RadioState::PoweredOn,
        CentralState::PoweredOff => RadioState::PoweredOff,
        _ => RadioState::Unknown,
    }
}

/// Adapter events the bridge cares about
#[derive(Debug)]
enum Sighting {
    /// `repeat` is set for `DeviceUpdated`, which is how btleplug reports
    /// rediscovery of a peripheral it already knows.
    Device {
        id: platform::PeripheralId,
        repeat: bool,
    },
    State(RadioState),
}

fn classify(event: CentralEvent) -> Option<Sighting> {
    match event {
        CentralEvent::DeviceDiscovered(id) => Some(Sighting::Device { id, repeat: false }),
        CentralEvent::DeviceUpdated(id) => Some(Sighting::Device { id, repeat: true }),
        CentralEvent::StateUpdate(state) => Some(Sighting::State(radio_state(state))),
        _ => None,
    }
}

/// Services the peripheral advertises, empty when they cannot be read
async fn advertised_services(adapter: &Adapter, id: &platform::PeripheralId) -> Vec<Uuid> {
    let peripheral = match adapter.peripheral(id).await {
        Ok(peripheral) => peripheral,
        Err(e) => {
            debug!("Peripheral {} vanished: {}", id, e);
            return Vec::new();
        }
    };
    match peripheral.properties().await {
        Ok(Some(properties)) => properties.services,
        Ok(None) => Vec::new(),
        Err(e) => {
            debug!("No properties for {}: {}", id, e);
            Vec::new()
        }
    }
}

fn current(active: &ActiveScan) -> Option<ScanRequest> {
    match active.lock() {
        Ok(request) => request.clone(),
        Err(_) => {
            warn!("Scan state poisoned, dropping sighting");
            None
        }
    }
}

fn set_active(active: &ActiveScan, request: Option<ScanRequest>) {
    match active.lock() {
        Ok(mut current) => *current = request,
        Err(_) => warn!("Scan state poisoned, filter not updated"),
    }
}

fn remember(known: &KnownPeripherals, id: platform::PeripheralId) -> PeripheralId {
    let key = PeripheralId::new(id.to_string());
    match known.lock() {
        Ok(mut map) => {
            map.entry(key.clone()).or_insert(id);
        }
        Err(_) => warn!("Known peripheral map poisoned, {} not recorded", key),
    }
    key
}
