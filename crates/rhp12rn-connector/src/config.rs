//! Connection configuration.
//!
//! ```yaml
//! device: /dev/ttyUSB0
//! baud_rate: 2000000
//! bus_id: 1
//! model_number: 35074
//! min_tx_interval_us: 1000
//! drain:
//!   mode: polling
//!   poll_interval_us: 200
//!   timeout_ms: 50
//! ```

use crate::Result;
use rhp12rn_control_table::DeviceModel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default serial device.
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";

/// Factory default line speed.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Factory default bus id.
pub const DEFAULT_BUS_ID: u8 = 1;

/// Default minimum spacing between transmissions, in microseconds.
pub const DEFAULT_MIN_TX_INTERVAL_US: u64 = 1_000;

/// How pending responses are read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DrainMode {
    /// Block in the transport until the response arrives or the port times out.
    #[default]
    Blocking,
    /// Poll the transport without blocking until the response arrives or the
    /// host-side timeout expires.
    Polling {
        /// Sleep between polls, in microseconds.
        #[serde(default = "default_poll_interval_us")]
        poll_interval_us: u64,
        /// Give up after this long, in milliseconds.
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
}

fn default_poll_interval_us() -> u64 {
    100
}

fn default_timeout_ms() -> u64 {
    50
}

/// Settings for a [`Connection`](crate::Connection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Serial device path.
    #[serde(default = "default_device")]
    pub device: String,
    /// Line speed.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Dynamixel id of the gripper.
    #[serde(default = "default_bus_id")]
    pub bus_id: u8,
    /// Model number of the attached device, if known. Group reads require it.
    #[serde(default)]
    pub model_number: Option<u16>,
    /// Minimum spacing between transmissions, in microseconds.
    #[serde(default = "default_min_tx_interval_us")]
    pub min_tx_interval_us: u64,
    /// How responses are read back.
    #[serde(default)]
    pub drain: DrainMode,
}

fn default_device() -> String {
    DEFAULT_DEVICE.to_string()
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_bus_id() -> u8 {
    DEFAULT_BUS_ID
}

fn default_min_tx_interval_us() -> u64 {
    DEFAULT_MIN_TX_INTERVAL_US
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            device: default_device(),
            baud_rate: DEFAULT_BAUD_RATE,
            bus_id: DEFAULT_BUS_ID,
            model_number: None,
            min_tx_interval_us: DEFAULT_MIN_TX_INTERVAL_US,
            drain: DrainMode::Blocking,
        }
    }
}

impl ConnectionConfig {
    /// Defaults for a known model.
    pub fn for_model(model: DeviceModel) -> Self {
        ConnectionConfig {
            model_number: Some(model.model_number()),
            ..Default::default()
        }
    }

    /// Parse from YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Set the device path.
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    /// Set the line speed.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the bus id.
    pub fn with_bus_id(mut self, bus_id: u8) -> Self {
        self.bus_id = bus_id;
        self
    }

    /// Set the minimum spacing between transmissions.
    pub fn with_min_tx_interval(mut self, interval: Duration) -> Self {
        self.min_tx_interval_us = u64::try_from(interval.as_micros()).unwrap_or(u64::MAX);
        self
    }

    /// Set the drain mode.
    pub fn with_drain(mut self, drain: DrainMode) -> Self {
        self.drain = drain;
        self
    }

    /// Minimum spacing between transmissions.
    pub fn min_tx_interval(&self) -> Duration {
        Duration::from_micros(self.min_tx_interval_us)
    }
}
