//! A single simulated device.

use rhp12rn_control_table::{DeviceModel, Field};
use rhp12rn_transport::{RawResponse, ERRNUM_ACCESS, ERRNUM_DATA_LENGTH, ERRNUM_DATA_RANGE};

/// Bytes of control table per simulated device.
pub const CONTROL_TABLE_SIZE: usize = 1024;

/// Factory default line speed.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// An in-memory control table with per-byte write permissions.
#[derive(Debug, Clone)]
pub struct SimDevice {
    model_number: u16,
    baud_rate: u32,
    memory: Vec<u8>,
    writable: Vec<bool>,
    /// (torque_enable address, first RAM address). EEPROM writes are refused
    /// while torque is enabled.
    eeprom_lock: Option<(u16, u16)>,
}

impl SimDevice {
    /// Create a device from a field list.
    ///
    /// Each field's initial value is written to memory; bytes covered by a
    /// writable field accept writes, everything else is read-only.
    pub fn from_fields(model_number: u16, fields: &[Field]) -> Self {
        let mut device = SimDevice {
            model_number,
            baud_rate: DEFAULT_BAUD_RATE,
            memory: vec![0; CONTROL_TABLE_SIZE],
            writable: vec![false; CONTROL_TABLE_SIZE],
            eeprom_lock: None,
        };
        for field in fields {
            let start = usize::from(field.address);
            let end = (start + field.data_type.size()).min(CONTROL_TABLE_SIZE);
            if start >= end {
                continue;
            }
            device.writable[start..end].fill(field.writable);
            if let Some(value) = field.initial_value {
                if let Ok(bytes) = field.encode(value) {
                    device.memory[start..end].copy_from_slice(&bytes[..end - start]);
                }
            }
        }
        device
    }

    /// Create a device with a built-in register map.
    pub fn from_model(model: DeviceModel) -> Self {
        let fields = model.fields();
        let mut device = SimDevice::from_fields(model.model_number(), &fields);
        let torque = fields.iter().find(|f| f.name == "torque_enable").map(|f| f.address);
        let ram_start = model.ram_fields().iter().map(|f| f.address).min();
        if let (Some(torque), Some(ram_start)) = (torque, ram_start) {
            device.eeprom_lock = Some((torque, ram_start));
        }
        device
    }

    /// Set the line speed the device listens on.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Model number the device was built with.
    pub fn model_number(&self) -> u16 {
        self.model_number
    }

    /// Line speed the device listens on.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Raw bytes, or `None` if the range leaves the control table.
    pub fn peek(&self, address: u16, length: u16) -> Option<&[u8]> {
        let start = usize::from(address);
        self.memory.get(start..start + usize::from(length))
    }

    /// Overwrite raw bytes, ignoring write permissions.
    ///
    /// Returns `false` if the range leaves the control table.
    pub fn poke(&mut self, address: u16, bytes: &[u8]) -> bool {
        let start = usize::from(address);
        match self.memory.get_mut(start..start + bytes.len()) {
            Some(target) => {
                target.copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }

    /// Answer a read request.
    pub(crate) fn read(&self, address: u16, length: u16) -> RawResponse {
        match self.peek(address, length) {
            Some(bytes) => RawResponse::ok(bytes.to_vec()),
            None => RawResponse::error(ERRNUM_DATA_RANGE),
        }
    }

    /// Answer a write request.
    pub(crate) fn write(&mut self, address: u16, length: u16, payload: &[u8]) -> RawResponse {
        if payload.len() != usize::from(length) {
            return RawResponse::error(ERRNUM_DATA_LENGTH);
        }
        let start = usize::from(address);
        let Some(permissions) = self.writable.get(start..start + payload.len()) else {
            return RawResponse::error(ERRNUM_DATA_RANGE);
        };
        if !permissions.iter().all(|&w| w) {
            return RawResponse::error(ERRNUM_ACCESS);
        }
        if let Some((torque, ram_start)) = self.eeprom_lock {
            let torque_on = self.memory[usize::from(torque)] != 0;
            if torque_on && address < ram_start {
                return RawResponse::error(ERRNUM_ACCESS);
            }
        }
        self.poke(address, payload);
        RawResponse::ok(Vec::new())
    }
}
