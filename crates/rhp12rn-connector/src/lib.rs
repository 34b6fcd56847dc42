//! # rhp12rn-connector
//!
//! Pipelined field access for ROBOTIS RH-P12-RN and RH-P12-RN(A) grippers.
//!
//! A [`Connection`] owns one port on a [`Bus`](rhp12rn_transport::Bus), a
//! [`FieldRegistry`](rhp12rn_control_table::FieldRegistry) and a queue of
//! in-flight requests. Field reads and writes are turned into requests on the
//! wire and may be pipelined: several requests can be transmitted before any
//! response is read, and responses are always consumed in transmission order.
//!
//! ## Pipelining
//!
//! ```text
//! read_field_async("a") ──► send ──► queue: [a]
//! read_field_async("b") ──► send ──► queue: [a, b]
//! result(hb)            ──► drain a (cached), drain b ──► value of b
//! result(ha)            ──► cached, no bus traffic
//! ```
//!
//! Consecutive transmissions are spaced at least
//! [`ConnectionConfig::min_tx_interval_us`] apart.
//!
//! ## Example
//!
//! ```
//! use rhp12rn_connector::{Connection, ConnectionConfig};
//! use rhp12rn_control_table::DeviceModel;
//! use rhp12rn_sim::{SimBus, SimDevice};
//!
//! let bus = SimBus::new();
//! bus.add_device(1, SimDevice::from_model(DeviceModel::RhP12RnA));
//!
//! let mut conn = Connection::for_model(bus, DeviceModel::RhP12RnA, ConnectionConfig::default());
//! conn.connect("/dev/ttyUSB0", 57_600, 1)?;
//!
//! let current = conn.write_field_async("goal_current", -50)?;
//! let model = conn.read_field_async("model_number")?;
//! assert_eq!(conn.result(model)?, 35074);
//! assert_eq!(conn.result(current)?, -50);
//! assert_eq!(conn.read_field("goal_current")?, -50);
//!
//! let status = conn.group_read()?;
//! assert_eq!(status["present_position"], 0);
//! conn.disconnect();
//! # Ok::<(), rhp12rn_connector::ConnectorError>(())
//! ```

mod config;
mod connection;
mod error;
mod group;
mod gripper;
mod pacing;
mod queue;
mod scan;
mod shared;
mod telemetry;

pub use config::{
    ConnectionConfig, DrainMode, DEFAULT_BAUD_RATE, DEFAULT_BUS_ID, DEFAULT_DEVICE,
    DEFAULT_MIN_TX_INTERVAL_US,
};
pub use connection::{with_connection, Connection, Handle};
pub use error::ConnectorError;
pub use gripper::{
    from_relative, to_relative, Gripper, GripperStatus, OPERATING_MODE_CURRENT,
    OPERATING_MODE_POSITION,
};
pub use scan::{find_grippers, scan, FoundDevice, ScanOptions, DEFAULT_SCAN_BAUD_RATES};
pub use shared::SharedConnection;
pub use telemetry::{describe_metrics, metric_defs, Metric, MetricKind};

/// Result type for connector operations.
pub type Result<T> = std::result::Result<T, ConnectorError>;
