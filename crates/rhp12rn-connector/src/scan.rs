//! Gripper discovery.

use crate::config::{ConnectionConfig, DrainMode};
use crate::{Connection, ConnectorError, Result};
use rhp12rn_control_table::{DataType, DeviceModel, Field, FieldRegistry, MODEL_NUMBER_FIELD};
use rhp12rn_transport::{Bus, MAX_ID};
use std::ops::RangeInclusive;
use tracing::{debug, info};

/// Baud rates tried by default.
pub const DEFAULT_SCAN_BAUD_RATES: [u32; 8] = [
    9_600, 57_600, 115_200, 1_000_000, 2_000_000, 3_000_000, 4_000_000, 4_500_000,
];

/// What to sweep.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Serial device path.
    pub device: String,
    /// Baud rates to try, in order.
    pub baud_rates: Vec<u32>,
    /// Bus ids to probe at each baud rate.
    pub ids: RangeInclusive<u8>,
    /// How responses are read back.
    pub drain: DrainMode,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            device: crate::config::DEFAULT_DEVICE.to_string(),
            baud_rates: DEFAULT_SCAN_BAUD_RATES.to_vec(),
            ids: 1..=MAX_ID,
            drain: DrainMode::Blocking,
        }
    }
}

/// A gripper that answered the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoundDevice {
    /// Model resolved from the model number.
    pub model: DeviceModel,
    /// Baud rate it answered at.
    pub baud_rate: u32,
    /// Its bus id.
    pub bus_id: u8,
}

impl std::fmt::Display for FoundDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} with ID {} at baud rate {}", self.model, self.bus_id, self.baud_rate)
    }
}

/// Probe every `(baud rate, id)` pair for a known gripper.
///
/// Ids that do not answer, or answer with a device error or an unknown
/// model number, are skipped. Failing to open the port aborts the sweep.
pub fn scan<B: Bus + Clone>(bus: &B, options: &ScanOptions) -> Result<Vec<FoundDevice>> {
    let registry = FieldRegistry::new([Field::new(0, DataType::U16, MODEL_NUMBER_FIELD, "Model Number")]);
    let config = ConnectionConfig {
        device: options.device.clone(),
        drain: options.drain,
        ..Default::default()
    };
    let mut conn = Connection::new(bus.clone(), registry, config);

    let mut found = Vec::new();
    for &baud_rate in &options.baud_rates {
        debug!(baud_rate, "testing baud rate");
        for bus_id in options.ids.clone() {
            let probe = conn.scoped(&options.device, baud_rate, bus_id, |conn| {
                conn.read_field(MODEL_NUMBER_FIELD)
            });
            let model_number = match probe {
                Ok(value) => value,
                Err(ConnectorError::Communication(_) | ConnectorError::Device(_)) => continue,
                Err(err) => return Err(err),
            };
            let model = u16::try_from(model_number)
                .ok()
                .and_then(DeviceModel::from_model_number);
            if let Some(model) = model {
                let device = FoundDevice {
                    model,
                    baud_rate,
                    bus_id,
                };
                info!(%device, "found gripper");
                found.push(device);
            }
        }
    }
    Ok(found)
}

/// Probe every id on `device` at the default baud rates.
pub fn find_grippers<B: Bus + Clone>(bus: &B, device: &str) -> Result<Vec<FoundDevice>> {
    scan(
        bus,
        &ScanOptions {
            device: device.to_string(),
            ..Default::default()
        },
    )
}
