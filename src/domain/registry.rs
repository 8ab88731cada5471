use crate::domain::models::{PeripheralId, VirtualDevice};
use std::collections::HashMap;

/// Virtual devices created so far, keyed by physical peripheral.
#[derive(Debug, Default)]
pub struct VirtualDeviceRegistry {
    devices: HashMap<PeripheralId, Vec<VirtualDevice>>,
}

impl VirtualDeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the devices for `id`, calling `create` only if none exist yet.
    ///
    /// `create` carries the registration side effect, so it runs at most
    /// once per peripheral for the lifetime of the registry.
    pub fn resolve<F>(&mut self, id: &PeripheralId, create: F) -> &mut [VirtualDevice]
    where
        F: FnOnce(&PeripheralId) -> Vec<VirtualDevice>,
    {
        self.devices
            .entry(id.clone())
            .or_insert_with(|| create(id))
            .as_mut_slice()
    }

    pub fn get(&self, id: &PeripheralId) -> Option<&[VirtualDevice]> {
        self.devices.get(id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
