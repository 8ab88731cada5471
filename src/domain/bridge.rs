//! Discovery Loop
//!
//! Owns all bridge state and drives each accepted peripheral through
//!
//! ```text
//! Idle -> Accepted -> Connected -> Identified -> ReadingSequence -> Disconnected
//! ```
//!
//! Sessions run one at a time on the driver task. Discovery events that
//! arrive meanwhile wait in the radio channel and are coalesced per
//! peripheral before the next round is handled.

use crate::domain::debounce::DebounceRegistry;
use crate::domain::error::BridgeError;
use crate::domain::models::{
    BridgeConfig, PeripheralId, RadioEvent, SessionState, Stage, VirtualDevice,
};
use crate::domain::ports::{EventSink, Radio, SensorLink};
use crate::domain::registry::VirtualDeviceRegistry;
use crate::domain::scan_guard::ScanActivationGuard;
use crate::domain::sequencer::{within, ReadSequencer};
use std::collections::HashSet;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

pub struct Bridge<R: Radio, S: EventSink> {
    radio: R,
    sink: S,
    config: BridgeConfig,
    debounce: DebounceRegistry,
    devices: VirtualDeviceRegistry,
    scan_guard: ScanActivationGuard,
}

impl<R: Radio, S: EventSink> Bridge<R, S> {
    pub fn new(radio: R, sink: S, config: BridgeConfig) -> Self {
        Self {
            debounce: DebounceRegistry::new(config.cooldown),
            devices: VirtualDeviceRegistry::new(),
            scan_guard: ScanActivationGuard::new(config.scan.clone()),
            radio,
            sink,
            config,
        }
    }

    /// Wait for the application to come up, then service radio events until
    /// the radio channel closes.
    pub async fn run(
        mut self,
        ready: oneshot::Receiver<()>,
        mut events: mpsc::UnboundedReceiver<RadioEvent>,
    ) -> Result<(), BridgeError> {
        if ready.await.is_err() {
            info!("Application went away before signalling readiness");
            return Ok(());
        }

        self.start().await;

        while let Some(event) = events.recv().await {
            let mut queued = vec![event];
            while let Ok(event) = events.try_recv() {
                queued.push(event);
            }

            let (batch, dropped) = coalesce(queued);
            if dropped > 0 {
                debug!("Dropped {} repeated discoveries queued behind a session", dropped);
            }
            for event in batch {
                self.handle_event(event).await;
            }
        }

        info!("Radio event stream closed, stopping");
        self.debounce.clear();
        Ok(())
    }

    pub async fn start(&mut self) {
        info!("Starting up");
        self.scan_guard.activate(&self.radio).await;
    }

    pub async fn handle_event(&mut self, event: RadioEvent) {
        match event {
            RadioEvent::StateChanged(state) => {
                self.scan_guard.on_state_change(&self.radio, state).await;
            }
            RadioEvent::Discovered(id) => {
                self.on_discovered(&id).await;
            }
        }
    }

    pub fn devices(&self) -> &VirtualDeviceRegistry {
        &self.devices
    }

    /// Gate a discovery through the cooldown and run a session if accepted.
    ///
    /// Returns the state the session ended in.
    pub async fn on_discovered(&mut self, id: &PeripheralId) -> SessionState {
        if !self.debounce.should_accept(id) {
            trace!("Ignoring {}", id);
            return SessionState::Idle;
        }
        transition(id, SessionState::Accepted);
        info!("Connecting to {}", id);

        let (state, result) = self.run_session(id).await;
        match result {
            Ok(count) => info!("Read {} values from {}", count, id),
            Err(e) => warn!("Session with {} ended in {:?}: {}", id, state, e),
        }
        state
    }

    async fn run_session(
        &mut self,
        id: &PeripheralId,
    ) -> (SessionState, Result<usize, BridgeError>) {
        let mut link = match self.radio.link(id).await {
            Ok(link) => link,
            Err(e) => return (SessionState::Accepted, Err(e)),
        };

        let mut state = SessionState::Accepted;
        if let Err(e) = self.identify(id, &mut link, &mut state).await {
            let limit = self.config.connect_timeout;
            if let Err(close) = within(limit, Stage::Disconnect, link.disconnect()).await {
                debug!("Disconnect after failure also failed: {}", close);
            }
            return (state, Err(e));
        }

        let sink = &mut self.sink;
        let devices = self.devices.resolve(id, |id| {
            let family = VirtualDevice::family(id);
            for device in &family {
                sink.register(&device.descriptor());
            }
            family
        });

        transition(id, SessionState::ReadingSequence);
        let result = ReadSequencer::new(self.config.read_timeout)
            .run(&mut link, devices, sink)
            .await;

        transition(id, SessionState::Disconnected);
        (SessionState::Disconnected, result)
    }

    /// Connect, enumerate services and read the serial number.
    async fn identify(
        &self,
        id: &PeripheralId,
        link: &mut R::Link,
        state: &mut SessionState,
    ) -> Result<String, BridgeError> {
        let limit = self.config.connect_timeout;

        within(limit, Stage::Connect, link.connect()).await?;
        *state = SessionState::Connected;
        transition(id, *state);

        within(limit, Stage::DiscoverServices, link.discover_services()).await?;
        let serial = within(limit, Stage::ReadSerialNumber, link.read_serial_number()).await?;
        *state = SessionState::Identified;
        transition(id, *state);
        info!("Connected to device {} with serial number: {}", id, serial);

        Ok(serial)
    }
}

/// Keep the first discovery of each peripheral and every state change, in
/// arrival order. Returns the kept events and how many were dropped.
fn coalesce(events: Vec<RadioEvent>) -> (Vec<RadioEvent>, usize) {
    let total = events.len();
    let mut seen = HashSet::new();
    let kept: Vec<_> = events
        .into_iter()
        .filter(|event| match event {
            RadioEvent::Discovered(id) => seen.insert(id.clone()),
            RadioEvent::StateChanged(_) => true,
        })
        .collect();
    let dropped = total - kept.len();
    (kept, dropped)
}

fn transition(id: &PeripheralId, state: SessionState) {
    debug!(peripheral = %id, ?state, "Session transition");
}
