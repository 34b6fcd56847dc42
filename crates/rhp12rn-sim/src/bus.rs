//! Simulated bus and port.

use crate::SimDevice;
use parking_lot::Mutex;
use rhp12rn_transport::{Bus, CommFailure, Port, RawResponse, TransportError};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::trace;

// ============================================================================
// Types
// ============================================================================

/// What a transmission asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransmissionKind {
    /// Read request.
    Read {
        /// Start address.
        address: u16,
        /// Number of bytes.
        length: u16,
    },
    /// Write request.
    Write {
        /// Start address.
        address: u16,
        /// Payload bytes.
        data: Vec<u8>,
    },
    /// Bulk read of the registered range.
    BulkRead,
}

/// One packet the host put on the wire.
#[derive(Debug, Clone)]
pub struct Transmission {
    /// When the port accepted the packet.
    pub at: Instant,
    /// Target device.
    pub bus_id: u8,
    /// Request contents.
    pub kind: TransmissionKind,
}

/// Fault applied to the reply of the next request.
#[derive(Debug, Clone, Copy)]
enum ReplyFault {
    Comm(CommFailure),
    Device(u8),
}

#[derive(Debug, Default)]
struct Faults {
    open: Option<String>,
    reject_baud: bool,
    send: VecDeque<CommFailure>,
    reply: VecDeque<ReplyFault>,
}

#[derive(Debug, Default)]
struct Counters {
    opens: usize,
    closes: usize,
    receives: usize,
    bulk_registrations: usize,
}

#[derive(Debug, Default)]
struct SimState {
    devices: BTreeMap<u8, SimDevice>,
    faults: Faults,
    counters: Counters,
    transmissions: Vec<Transmission>,
    response_delay: Duration,
}

impl SimState {
    /// Device at `bus_id` listening at `baud_rate`.
    fn device_mut(&mut self, bus_id: u8, baud_rate: Option<u32>) -> Option<&mut SimDevice> {
        self.devices
            .get_mut(&bus_id)
            .filter(|device| Some(device.baud_rate()) == baud_rate)
    }

    /// Apply a queued reply fault, if any.
    fn fault_reply(&mut self, reply: RawResponse) -> Result<RawResponse, CommFailure> {
        match self.faults.reply.pop_front() {
            Some(ReplyFault::Comm(failure)) => Err(failure),
            Some(ReplyFault::Device(code)) => Ok(RawResponse::error(code)),
            None => Ok(reply),
        }
    }
}

// ============================================================================
// Bus
// ============================================================================

/// A simulated multi-drop bus.
#[derive(Debug, Clone, Default)]
pub struct SimBus {
    state: Arc<Mutex<SimState>>,
}

impl SimBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        SimBus::default()
    }

    /// Attach a device at `bus_id`, replacing any existing one.
    pub fn add_device(&self, bus_id: u8, device: SimDevice) {
        self.state.lock().devices.insert(bus_id, device);
    }

    /// Delay between a request and its status packet becoming readable.
    pub fn set_response_delay(&self, delay: Duration) {
        self.state.lock().response_delay = delay;
    }

    /// Raw control table bytes of a device.
    pub fn peek(&self, bus_id: u8, address: u16, length: u16) -> Option<Vec<u8>> {
        let state = self.state.lock();
        state
            .devices
            .get(&bus_id)
            .and_then(|device| device.peek(address, length))
            .map(<[u8]>::to_vec)
    }

    /// Overwrite control table bytes of a device, ignoring permissions.
    pub fn poke(&self, bus_id: u8, address: u16, bytes: &[u8]) -> bool {
        let mut state = self.state.lock();
        state
            .devices
            .get_mut(&bus_id)
            .is_some_and(|device| device.poke(address, bytes))
    }

    // ------------------------------------------------------------------------
    // Fault injection
    // ------------------------------------------------------------------------

    /// Make the next `open_port` fail.
    pub fn fail_next_open(&self, reason: impl Into<String>) {
        self.state.lock().faults.open = Some(reason.into());
    }

    /// Make the next `set_baud_rate` fail.
    pub fn reject_next_baud_rate(&self) {
        self.state.lock().faults.reject_baud = true;
    }

    /// Make the next transmission fail.
    pub fn fail_next_send(&self, failure: CommFailure) {
        self.state.lock().faults.send.push_back(failure);
    }

    /// Make the reply to the next request a communication failure.
    pub fn fail_next_reply(&self, failure: CommFailure) {
        self.state.lock().faults.reply.push_back(ReplyFault::Comm(failure));
    }

    /// Make the reply to the next request carry a device error byte.
    pub fn reply_next_with_error(&self, code: u8) {
        self.state.lock().faults.reply.push_back(ReplyFault::Device(code));
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Every packet transmitted so far, oldest first.
    pub fn transmissions(&self) -> Vec<Transmission> {
        self.state.lock().transmissions.clone()
    }

    /// Number of packets transmitted so far.
    pub fn transmission_count(&self) -> usize {
        self.state.lock().transmissions.len()
    }

    /// Number of `receive_response` calls so far.
    pub fn receive_count(&self) -> usize {
        self.state.lock().counters.receives
    }

    /// Number of successful `open_port` calls so far.
    pub fn open_count(&self) -> usize {
        self.state.lock().counters.opens
    }

    /// Number of `close` calls so far.
    pub fn close_count(&self) -> usize {
        self.state.lock().counters.closes
    }

    /// Ports opened but not yet closed.
    pub fn open_ports(&self) -> usize {
        let state = self.state.lock();
        state.counters.opens - state.counters.closes
    }

    /// Number of `register_bulk_read` calls so far.
    pub fn bulk_registrations(&self) -> usize {
        self.state.lock().counters.bulk_registrations
    }
}

impl Bus for SimBus {
    type Port = SimPort;

    fn open_port(&mut self, device: &str) -> Result<SimPort, TransportError> {
        let mut state = self.state.lock();
        if let Some(reason) = state.faults.open.take() {
            return Err(TransportError::OpenFailed {
                device: device.to_string(),
                reason,
            });
        }
        state.counters.opens += 1;
        trace!(device, "sim port opened");
        Ok(SimPort {
            state: Arc::clone(&self.state),
            baud_rate: None,
            replies: VecDeque::new(),
            bulk: None,
            closed: false,
        })
    }
}

// ============================================================================
// Port
// ============================================================================

struct PendingReply {
    bus_id: u8,
    ready_at: Instant,
    reply: Result<RawResponse, CommFailure>,
}

/// An open port on a [`SimBus`].
pub struct SimPort {
    state: Arc<Mutex<SimState>>,
    baud_rate: Option<u32>,
    replies: VecDeque<PendingReply>,
    bulk: Option<(u8, u16, u16)>,
    closed: bool,
}

impl SimPort {
    /// Number of status packets waiting to be read.
    pub fn buffered_replies(&self) -> usize {
        self.replies.len()
    }
}

impl Port for SimPort {
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.faults.reject_baud) {
            return Err(TransportError::BaudRateRejected(baud_rate));
        }
        self.baud_rate = Some(baud_rate);
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.replies.clear();
            self.state.lock().counters.closes += 1;
            trace!("sim port closed");
        }
    }

    fn send_request(
        &mut self,
        bus_id: u8,
        address: u16,
        length: u16,
        payload: Option<&[u8]>,
    ) -> Result<(), CommFailure> {
        let mut state = self.state.lock();
        let now = Instant::now();
        let kind = match payload {
            Some(data) => TransmissionKind::Write {
                address,
                data: data.to_vec(),
            },
            None => TransmissionKind::Read { address, length },
        };
        state.transmissions.push(Transmission { at: now, bus_id, kind });

        if let Some(failure) = state.faults.send.pop_front() {
            return Err(failure);
        }

        let reply = match state.device_mut(bus_id, self.baud_rate) {
            Some(device) => match payload {
                Some(data) => Ok(device.write(address, length, data)),
                None => Ok(device.read(address, length)),
            },
            // Nobody on the line answers.
            None => Err(CommFailure::RxTimeout),
        };
        let reply = match reply {
            Ok(reply) => state.fault_reply(reply),
            Err(failure) => Err(failure),
        };
        trace!(bus_id, address, length, ok = reply.is_ok(), "sim request");

        self.replies.push_back(PendingReply {
            bus_id,
            ready_at: now + state.response_delay,
            reply,
        });
        Ok(())
    }

    fn receive_response(
        &mut self,
        bus_id: u8,
        _expected_length: u16,
        blocking: bool,
    ) -> Result<Option<RawResponse>, CommFailure> {
        self.state.lock().counters.receives += 1;

        let Some(front) = self.replies.front() else {
            return if blocking { Err(CommFailure::RxTimeout) } else { Ok(None) };
        };
        let now = Instant::now();
        if front.ready_at > now {
            if !blocking {
                return Ok(None);
            }
            thread::sleep(front.ready_at - now);
        }

        let Some(pending) = self.replies.pop_front() else {
            return Err(CommFailure::RxTimeout);
        };
        if pending.bus_id != bus_id {
            return Err(CommFailure::RxCorrupt);
        }
        pending.reply.map(Some)
    }

    fn register_bulk_read(
        &mut self,
        bus_id: u8,
        base_address: u16,
        length: u16,
    ) -> Result<(), CommFailure> {
        self.state.lock().counters.bulk_registrations += 1;
        self.bulk = Some((bus_id, base_address, length));
        Ok(())
    }

    fn bulk_read(&mut self) -> Result<RawResponse, CommFailure> {
        let (bus_id, address, length) = self.bulk.ok_or(CommFailure::NotAvailable)?;
        let mut state = self.state.lock();
        state.transmissions.push(Transmission {
            at: Instant::now(),
            bus_id,
            kind: TransmissionKind::BulkRead,
        });
        if let Some(failure) = state.faults.send.pop_front() {
            return Err(failure);
        }
        let reply = state
            .device_mut(bus_id, self.baud_rate)
            .map(|device| device.read(address, length))
            .ok_or(CommFailure::RxTimeout)?;
        let delay = state.response_delay;
        let reply = state.fault_reply(reply);
        drop(state);

        if !delay.is_zero() {
            thread::sleep(delay);
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhp12rn_control_table::DeviceModel;

    fn open(bus: &mut SimBus) -> SimPort {
        let mut port = bus.open_port("sim0").expect("open");
        port.set_baud_rate(crate::DEFAULT_BAUD_RATE).expect("baud");
        port
    }

    #[test]
    fn test_replies_in_order() {
        let mut bus = SimBus::new();
        bus.add_device(1, SimDevice::from_model(DeviceModel::RhP12RnA));
        let mut port = open(&mut bus);

        port.send_request(1, 0, 2, None).expect("send");
        port.send_request(1, 7, 1, None).expect("send");
        assert_eq!(port.buffered_replies(), 2);

        let first = port.receive_response(1, 2, true).expect("ok").expect("ready");
        assert_eq!(first.data, vec![0x02, 0x89]);
        let second = port.receive_response(1, 1, true).expect("ok").expect("ready");
        assert_eq!(second.data, vec![1]);
        assert_eq!(bus.transmission_count(), 2);
    }

    #[test]
    fn test_missing_device_times_out() {
        let mut bus = SimBus::new();
        let mut port = open(&mut bus);
        port.send_request(9, 0, 2, None).expect("send goes out");
        assert_eq!(port.receive_response(9, 2, true), Err(CommFailure::RxTimeout));
    }

    #[test]
    fn test_baud_mismatch_is_silent() {
        let mut bus = SimBus::new();
        bus.add_device(1, SimDevice::from_model(DeviceModel::RhP12Rn).with_baud_rate(2_000_000));
        let mut port = open(&mut bus);
        port.send_request(1, 0, 2, None).expect("send");
        assert_eq!(port.receive_response(1, 2, true), Err(CommFailure::RxTimeout));
    }

    #[test]
    fn test_nonblocking_with_delay() {
        let mut bus = SimBus::new();
        bus.add_device(1, SimDevice::from_model(DeviceModel::RhP12RnA));
        bus.set_response_delay(Duration::from_millis(20));
        let mut port = open(&mut bus);

        assert_eq!(port.receive_response(1, 2, false), Ok(None));
        port.send_request(1, 0, 2, None).expect("send");
        assert_eq!(port.receive_response(1, 2, false), Ok(None));
        let resp = port.receive_response(1, 2, true).expect("ok").expect("ready");
        assert_eq!(resp.data.len(), 2);
    }

    #[test]
    fn test_fault_injection() {
        let mut bus = SimBus::new();
        bus.add_device(1, SimDevice::from_model(DeviceModel::RhP12RnA));
        let mut port = open(&mut bus);

        bus.fail_next_send(CommFailure::TxFail);
        assert_eq!(port.send_request(1, 0, 2, None), Err(CommFailure::TxFail));
        assert_eq!(port.buffered_replies(), 0);

        bus.reply_next_with_error(0x04);
        port.send_request(1, 0, 2, None).expect("send");
        let resp = port.receive_response(1, 2, true).expect("ok").expect("ready");
        assert_eq!(resp.status.code(), 0x04);

        bus.fail_next_reply(CommFailure::RxCorrupt);
        port.send_request(1, 0, 2, None).expect("send");
        assert_eq!(port.receive_response(1, 2, true), Err(CommFailure::RxCorrupt));
    }

    #[test]
    fn test_open_close_accounting() {
        let mut bus = SimBus::new();
        bus.fail_next_open("busy");
        assert!(bus.open_port("sim0").is_err());
        assert_eq!(bus.open_ports(), 0);

        let mut port = open(&mut bus);
        assert_eq!(bus.open_ports(), 1);
        port.close();
        port.close();
        assert_eq!(bus.close_count(), 1);
        assert_eq!(bus.open_ports(), 0);
    }

    #[test]
    fn test_bulk_read() {
        let mut bus = SimBus::new();
        bus.add_device(1, SimDevice::from_model(DeviceModel::RhP12RnA));
        let mut port = open(&mut bus);

        assert_eq!(port.bulk_read(), Err(CommFailure::NotAvailable));
        port.register_bulk_read(1, 568, 16).expect("register");
        bus.poke(1, 574, &0x8000u16.to_le_bytes());
        let resp = port.bulk_read().expect("bulk");
        assert_eq!(resp.data.len(), 16);
        assert_eq!(&resp.data[6..8], &[0x00, 0x80]);
        assert_eq!(bus.bulk_registrations(), 1);
    }
}
