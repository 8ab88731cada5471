use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Opaque identifier of a physical peripheral as reported by the radio layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeripheralId(String);

impl PeripheralId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeripheralId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Measurement kinds exposed by a Flower Power sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Temperature,
    Light,
    Moisture,
}

impl SensorKind {
    /// Fixed order in which virtual devices are created and read.
    pub const ALL: [SensorKind; 3] = [Self::Temperature, Self::Light, Self::Moisture];

    /// Label used in the virtual device name
    pub fn label(&self) -> &'static str {
        match self {
            Self::Temperature => "Temp",
            Self::Light => "Sun",
            Self::Moisture => "Moisture",
        }
    }

    /// Channel tag the consuming application uses to type the device
    pub fn channel_id(&self) -> u32 {
        match self {
            Self::Temperature => 9,
            Self::Light => 2000,
            Self::Moisture => 8,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temperature => f.write_str("temperature"),
            Self::Light => f.write_str("sunlight"),
            Self::Moisture => f.write_str("soil moisture"),
        }
    }
}

/// Descriptor handed to the application when a virtual device is registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualDeviceDescriptor {
    pub name: String,
    pub channel_id: u32,
    pub group_id: String,
}

/// A single completed measurement for one virtual device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub name: String,
    pub channel_id: u32,
    pub group_id: String,
    pub value: f64,
}

/// One logical sensor channel synthesized from a physical peripheral.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualDevice {
    peripheral: PeripheralId,
    kind: SensorKind,
    name: String,
    group_id: String,
    last_value: f64,
}

impl VirtualDevice {
    pub fn new(peripheral: &PeripheralId, kind: SensorKind) -> Self {
        Self {
            peripheral: peripheral.clone(),
            kind,
            name: format!("Flower Power {} {}", kind.label(), peripheral),
            group_id: format!("flowerpower{}", peripheral),
            last_value: 0.0,
        }
    }

    /// The full temperature, light, moisture set for one peripheral
    pub fn family(peripheral: &PeripheralId) -> Vec<Self> {
        SensorKind::ALL
            .iter()
            .map(|kind| Self::new(peripheral, *kind))
            .collect()
    }

    pub fn peripheral(&self) -> &PeripheralId {
        &self.peripheral
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn last_value(&self) -> f64 {
        self.last_value
    }

    pub fn descriptor(&self) -> VirtualDeviceDescriptor {
        VirtualDeviceDescriptor {
            name: self.name.clone(),
            channel_id: self.kind.channel_id(),
            group_id: self.group_id.clone(),
        }
    }

    /// Store a fresh measurement and build the reading to publish.
    pub fn record(&mut self, value: f64) -> Reading {
        self.last_value = value;
        Reading {
            name: self.name.clone(),
            channel_id: self.kind.channel_id(),
            group_id: self.group_id.clone(),
            value,
        }
    }
}

/// Events published to the consuming application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    Register(VirtualDeviceDescriptor),
    Data(Reading),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioState {
    Unknown,
    PoweredOff,
    PoweredOn,
}

impl RadioState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::PoweredOn)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    Discovered(PeripheralId),
    StateChanged(RadioState),
}

/// Parameters for starting a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub services: Vec<Uuid>,
    /// Report the same peripheral repeatedly so it can be polled again later
    pub allow_duplicates: bool,
}

impl ScanRequest {
    /// Whether a sighting of a peripheral advertising `services` counts as a
    /// discovery.
    ///
    /// `repeat` marks a sighting of an already known peripheral, which only
    /// counts when duplicates are allowed. The stack also reports devices it
    /// merely remembers, so the advertised services must match the filter.
    pub fn accepts(&self, repeat: bool, services: &[Uuid]) -> bool {
        if repeat && !self.allow_duplicates {
            return false;
        }
        self.services.is_empty() || services.iter().any(|s| self.services.contains(s))
    }
}

/// Lifecycle of one read session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Accepted,
    Connected,
    Identified,
    ReadingSequence,
    Disconnected,
}

/// Pipeline stage, used to label timeouts and failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    DiscoverServices,
    ReadSerialNumber,
    Read(SensorKind),
    Disconnect,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => f.write_str("connect"),
            Self::DiscoverServices => f.write_str("service discovery"),
            Self::ReadSerialNumber => f.write_str("serial number read"),
            Self::Read(kind) => write!(f, "{} read", kind),
            Self::Disconnect => f.write_str("disconnect"),
        }
    }
}

/// Timing and scan parameters for the bridge
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub cooldown: Duration,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub scan: ScanRequest,
}
