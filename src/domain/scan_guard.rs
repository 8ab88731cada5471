use crate::domain::models::{RadioState, ScanRequest};
use crate::domain::ports::Radio;
use tracing::{info, warn};

/// Starts scanning once, as soon as the radio reports it is ready.
#[derive(Debug)]
pub struct ScanActivationGuard {
    request: ScanRequest,
    scanning: bool,
}

impl ScanActivationGuard {
    pub fn new(request: ScanRequest) -> Self {
        Self {
            request,
            scanning: false,
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// Check the current radio state and start scanning if it is ready.
    pub async fn activate<R: Radio>(&mut self, radio: &R) -> bool {
        let state = match radio.state().await {
            Ok(state) => state,
            Err(e) => {
                warn!("Could not read radio state: {}", e);
                RadioState::Unknown
            }
        };
        self.on_state_change(radio, state).await
    }

    /// Returns true only for the state change that actually started the scan.
    pub async fn on_state_change<R: Radio>(&mut self, radio: &R, state: RadioState) -> bool {
        if self.scanning {
            return false;
        }
        if !state.is_ready() {
            info!("Radio is {:?}, waiting before scanning", state);
            return false;
        }

        info!(
            "Starting BLE scan for services {:?} (duplicates: {})",
            self.request.services, self.request.allow_duplicates
        );
        match radio.start_scanning(&self.request).await {
            Ok(()) => {
                self.scanning = true;
                true
            }
            Err(e) => {
                warn!("Failed to start scan: {}", e);
                false
            }
        }
    }
}
