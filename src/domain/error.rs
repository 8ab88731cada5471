use crate::domain::models::{PeripheralId, Stage};
use thiserror::Error;
use uuid::Uuid;

/// Failures along the discover, connect, read pipeline
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no Bluetooth adapter found")]
    NoAdapter,

    #[error("radio error: {0}")]
    Radio(String),

    #[error("{stage} timed out")]
    Timeout { stage: Stage },

    #[error("service {uuid} not offered by peripheral")]
    ServiceNotFound { uuid: Uuid },

    #[error("characteristic {uuid} not found")]
    CharacteristicNotFound { uuid: Uuid },

    #[error("invalid payload: {0}")]
    Payload(String),

    #[error("peripheral {0} is not known to the radio")]
    UnknownPeripheral(PeripheralId),
}
