//! Dynamixel Protocol 2.0 transport interface
//!
//! This crate describes the packet transport that the RH-P12-RN connector
//! drives. Framing, checksums and byte-level I/O belong to the implementation
//! (a serial port driver, or the simulator in `rhp12rn-sim`); the connector
//! only sees the operations below.
//!
//! # Transport Model
//!
//! The bus is half-duplex and multi-drop. The host opens a port, sets its
//! baud rate, and then alternates between:
//!
//! - **Requests** (host → device): read or write `length` bytes at `address`
//!   on the device with id `bus_id`
//! - **Status packets** (device → host): returned in request order, carrying
//!   the read data and an error byte
//!
//! A bulk read registers one address range with the port once; each later
//! [`Port::bulk_read`] fetches that range in a single transaction.
//!
//! # Example
//!
//! ```rust,ignore
//! use rhp12rn_transport::{Bus, Port};
//!
//! let mut port = bus.open_port("/dev/ttyUSB0")?;
//! port.set_baud_rate(57_600)?;
//! port.send_request(1, 0, 2, None)?;
//! let response = port.receive_response(1, 2, true)?;
//! port.close();
//! ```

mod constants;
mod error;
mod status;

pub use constants::*;
pub use error::*;
pub use status::*;

/// Factory for ports on one physical bus.
pub trait Bus {
    /// The open port handle.
    type Port: Port;

    /// Open the device at `device` (e.g. `/dev/ttyUSB0`).
    fn open_port(&mut self, device: &str) -> Result<Self::Port, TransportError>;
}

/// An open port.
///
/// Implementations do not need to guard against misuse after
/// [`close`](Port::close); the connector never touches a closed port.
pub trait Port {
    /// Configure the line speed.
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), TransportError>;

    /// Release the port.
    fn close(&mut self);

    /// Transmit a request.
    ///
    /// `payload` is `Some` for writes (exactly `length` bytes) and `None`
    /// for reads.
    fn send_request(
        &mut self,
        bus_id: u8,
        address: u16,
        length: u16,
        payload: Option<&[u8]>,
    ) -> Result<(), CommFailure>;

    /// Read the status packet for the oldest unanswered request.
    ///
    /// With `blocking` set, waits up to the port's own timeout. Without it,
    /// returns `Ok(None)` if nothing has arrived yet.
    fn receive_response(
        &mut self,
        bus_id: u8,
        expected_length: u16,
        blocking: bool,
    ) -> Result<Option<RawResponse>, CommFailure>;

    /// Register the range fetched by [`bulk_read`](Port::bulk_read).
    fn register_bulk_read(
        &mut self,
        bus_id: u8,
        base_address: u16,
        length: u16,
    ) -> Result<(), CommFailure>;

    /// Fetch the registered bulk range in one transaction.
    fn bulk_read(&mut self) -> Result<RawResponse, CommFailure>;
}

/// A status packet as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Parameter bytes (empty for write acknowledgements).
    pub data: Vec<u8>,
    /// Error byte reported by the device.
    pub status: DeviceStatus,
}

impl RawResponse {
    /// A successful response carrying `data`.
    pub fn ok(data: Vec<u8>) -> Self {
        RawResponse {
            data,
            status: DeviceStatus::OK,
        }
    }

    /// A response with a device error and no data.
    pub fn error(code: u8) -> Self {
        RawResponse {
            data: Vec::new(),
            status: DeviceStatus::new(code),
        }
    }
}
