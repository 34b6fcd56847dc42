//! # rhp12rn-sim
//!
//! An in-memory Dynamixel bus that implements the `rhp12rn-transport`
//! traits. Each simulated device is a flat control table initialised from a
//! field list; requests are answered the moment they are sent and the
//! answers are queued on the port until the host reads them, just like a
//! half-duplex line buffering status packets.
//!
//! The bus is cheap to clone. All clones share state, so a test can hand one
//! clone to a connector and keep another to inspect what went over the wire
//! or to inject faults.
//!
//! ```
//! use rhp12rn_control_table::DeviceModel;
//! use rhp12rn_sim::{SimBus, SimDevice};
//! use rhp12rn_transport::{Bus, Port};
//!
//! let mut bus = SimBus::new();
//! bus.add_device(1, SimDevice::from_model(DeviceModel::RhP12RnA));
//!
//! let mut port = bus.open_port("sim0").unwrap();
//! port.set_baud_rate(57_600).unwrap();
//! port.send_request(1, 0, 2, None).unwrap();
//! let response = port.receive_response(1, 2, true).unwrap().unwrap();
//! assert_eq!(response.data, 35074u16.to_le_bytes().to_vec());
//! port.close();
//! ```

mod bus;
mod device;

pub use bus::{SimBus, SimPort, Transmission, TransmissionKind};
pub use device::{SimDevice, CONTROL_TABLE_SIZE, DEFAULT_BAUD_RATE};
