//! In-memory radio, link and sink used by the unit tests.

use crate::domain::error::BridgeError;
use crate::domain::models::{
    PeripheralId, RadioState, Reading, ScanRequest, SensorKind, Stage, VirtualDeviceDescriptor,
};
use crate::domain::ports::{EventSink, Radio, SensorLink};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// Everything observable that happened, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    StartScan(ScanRequest),
    Connect(String),
    DiscoverServices(String),
    ReadSerial(String),
    Read(String, SensorKind),
    Disconnect(String),
    Register(String),
    Data(String, f64),
}

#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<Entry>>>);

impl Journal {
    pub fn push(&self, entry: Entry) {
        self.0.borrow_mut().push(entry);
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.0.borrow().clone()
    }

    pub fn count(&self, matches: impl Fn(&Entry) -> bool) -> usize {
        self.0.borrow().iter().filter(|e| matches(e)).count()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// How a scripted operation behaves
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Value(f64),
    Fail,
    Stall,
}

#[derive(Debug, Clone)]
pub struct FakePeripheral {
    pub connect: Step,
    /// `Fail` stands in for a peripheral without the live service
    pub discover: Step,
    pub serial: Option<String>,
    pub readings: VecDeque<Step>,
}

impl FakePeripheral {
    pub fn new(serial: &str, readings: impl IntoIterator<Item = f64>) -> Self {
        Self {
            connect: Step::Value(0.0),
            discover: Step::Value(0.0),
            serial: Some(serial.to_string()),
            readings: readings.into_iter().map(Step::Value).collect(),
        }
    }
}

type Peripherals = Rc<RefCell<HashMap<PeripheralId, FakePeripheral>>>;

pub struct FakeRadio {
    journal: Journal,
    state: Cell<RadioState>,
    fail_scan: Cell<bool>,
    peripherals: Peripherals,
}

impl FakeRadio {
    pub fn new(journal: Journal, state: RadioState) -> Self {
        Self {
            journal,
            state: Cell::new(state),
            fail_scan: Cell::new(false),
            peripherals: Rc::default(),
        }
    }

    pub fn add_peripheral(&self, id: &str, peripheral: FakePeripheral) {
        self.peripherals
            .borrow_mut()
            .insert(PeripheralId::from(id), peripheral);
    }

    pub fn set_state(&self, state: RadioState) {
        self.state.set(state);
    }

    pub fn fail_scan(&self, fail: bool) {
        self.fail_scan.set(fail);
    }
}

impl Radio for FakeRadio {
    type Link = FakeLink;

    async fn state(&self) -> Result<RadioState, BridgeError> {
        Ok(self.state.get())
    }

    async fn start_scanning(&self, request: &ScanRequest) -> Result<(), BridgeError> {
        if self.fail_scan.get() {
            return Err(BridgeError::Radio("scan refused".into()));
        }
        self.journal.push(Entry::StartScan(request.clone()));
        Ok(())
    }

    async fn link(&self, id: &PeripheralId) -> Result<FakeLink, BridgeError> {
        if !self.peripherals.borrow().contains_key(id) {
            return Err(BridgeError::UnknownPeripheral(id.clone()));
        }
        Ok(FakeLink {
            id: id.clone(),
            journal: self.journal.clone(),
            peripherals: self.peripherals.clone(),
        })
    }
}

pub struct FakeLink {
    id: PeripheralId,
    journal: Journal,
    peripherals: Peripherals,
}

impl FakeLink {
    fn name(&self) -> String {
        self.id.to_string()
    }

    async fn perform(step: Step, stage: Stage) -> Result<f64, BridgeError> {
        match step {
            Step::Value(value) => Ok(value),
            Step::Fail => Err(BridgeError::Radio(format!("{stage} failed"))),
            Step::Stall => std::future::pending().await,
        }
    }
}

impl SensorLink for FakeLink {
    async fn connect(&mut self) -> Result<(), BridgeError> {
        self.journal.push(Entry::Connect(self.name()));
        let step = self.peripherals.borrow()[&self.id].connect.clone();
        Self::perform(step, Stage::Connect).await.map(|_| ())
    }

    async fn discover_services(&mut self) -> Result<(), BridgeError> {
        self.journal.push(Entry::DiscoverServices(self.name()));
        let step = self.peripherals.borrow()[&self.id].discover.clone();
        Self::perform(step, Stage::DiscoverServices).await.map(|_| ())
    }

    async fn read_serial_number(&mut self) -> Result<String, BridgeError> {
        self.journal.push(Entry::ReadSerial(self.name()));
        let serial = self.peripherals.borrow()[&self.id].serial.clone();
        serial.ok_or_else(|| BridgeError::Payload("no serial number".into()))
    }

    async fn read(&mut self, kind: SensorKind) -> Result<f64, BridgeError> {
        self.journal.push(Entry::Read(self.name(), kind));
        let step = self
            .peripherals
            .borrow_mut()
            .get_mut(&self.id)
            .and_then(|p| p.readings.pop_front())
            .unwrap_or(Step::Fail);
        Self::perform(step, Stage::Read(kind)).await
    }

    async fn disconnect(&mut self) -> Result<(), BridgeError> {
        self.journal.push(Entry::Disconnect(self.name()));
        Ok(())
    }
}

pub struct RecordingSink {
    journal: Journal,
}

impl RecordingSink {
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

impl EventSink for RecordingSink {
    fn register(&mut self, device: &VirtualDeviceDescriptor) {
        self.journal.push(Entry::Register(device.name.clone()));
    }

    fn data(&mut self, reading: &Reading) {
        self.journal
            .push(Entry::Data(reading.name.clone(), reading.value));
    }
}
