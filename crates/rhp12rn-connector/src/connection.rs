//! Connection lifecycle and the pipelined request engine.

use crate::config::{ConnectionConfig, DrainMode};
use crate::pacing::TxPacer;
use crate::queue::{InFlight, Lookup, Owed, PendingQueue, Release};
use crate::telemetry::metric_defs;
use crate::{ConnectorError, Result};
use rhp12rn_control_table::{DeviceModel, FieldRegistry, GroupLayout, MODEL_NUMBER_FIELD};
use rhp12rn_transport::{Bus, CommFailure, Port, RawResponse};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Ticket for a pipelined request.
///
/// Redeem it with [`Connection::result`] or drop the result with
/// [`Connection::abandon`]. Dropping the handle also gives up the result;
/// the response is still read off the bus in turn. Handles are only valid on
/// the connection that issued them.
#[derive(Debug)]
#[must_use = "dropping a handle discards its result"]
pub struct Handle {
    owner: u64,
    seq: u64,
    release: Release,
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.release.release();
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        (self.owner, self.seq) == (other.owner, other.seq)
    }
}

impl Eq for Handle {}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.owner, self.seq).hash(state);
    }
}

/// The open port and the target it talks to.
struct Link<P> {
    port: P,
    bus_id: u8,
    bulk_registered: bool,
}

/// A connection to one gripper on a bus.
///
/// Requests are pipelined: the `*_async` methods transmit immediately and
/// return a [`Handle`], responses are read back in transmission order when a
/// result is requested. At most one port is held at a time, and it is
/// released on [`disconnect`](Self::disconnect) or drop.
pub struct Connection<B: Bus> {
    id: u64,
    bus: B,
    registry: FieldRegistry,
    config: ConnectionConfig,
    group_layout: Option<GroupLayout>,
    identified: Option<u16>,
    link: Option<Link<B::Port>>,
    queue: PendingQueue,
    orphans: HashMap<u64, Owed>,
    pacer: TxPacer,
}

impl<B: Bus> Connection<B> {
    /// Create a closed connection over `bus` with a caller-supplied field table.
    pub fn new(bus: B, registry: FieldRegistry, config: ConnectionConfig) -> Self {
        let pacer = TxPacer::new(config.min_tx_interval());
        Connection {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            bus,
            registry,
            config,
            group_layout: None,
            identified: None,
            link: None,
            queue: PendingQueue::new(),
            orphans: HashMap::new(),
            pacer,
        }
    }

    /// Create a closed connection using a built-in register map.
    ///
    /// The model number in `config` is set to the model's, and the model's
    /// group layout (if any) is installed.
    pub fn for_model(bus: B, model: DeviceModel, mut config: ConnectionConfig) -> Self {
        config.model_number = Some(model.model_number());
        let mut connection = Connection::new(bus, model.registry(), config);
        connection.group_layout = model.group_layout();
        connection
    }

    /// Install a bulk read layout.
    pub fn with_group_layout(mut self, layout: GroupLayout) -> Self {
        self.group_layout = Some(layout);
        self
    }

    /// The field table.
    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Current settings. Device, baud rate and bus id reflect the last connect.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The underlying bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Installed bulk read layout.
    pub fn group_layout(&self) -> Option<&GroupLayout> {
        self.group_layout.as_ref()
    }

    /// Model number of the attached device: configured, or learnt by
    /// [`identify`](Self::identify) since the last connect.
    pub fn model_number(&self) -> Option<u16> {
        self.config.model_number.or(self.identified)
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Whether a port is held.
    pub fn connected(&self) -> bool {
        self.link.is_some()
    }

    /// Open `device` at `baud_rate` and talk to `bus_id`.
    ///
    /// A port that opened but rejected the baud rate is closed before the
    /// error is returned.
    pub fn connect(&mut self, device: &str, baud_rate: u32, bus_id: u8) -> Result<()> {
        if self.link.is_some() {
            return Err(ConnectorError::AlreadyConnected);
        }
        let mut port = self
            .bus
            .open_port(device)
            .map_err(|source| ConnectorError::Connection {
                device: device.to_string(),
                source,
            })?;
        if let Err(source) = port.set_baud_rate(baud_rate) {
            port.close();
            return Err(ConnectorError::Connection {
                device: device.to_string(),
                source,
            });
        }

        self.config.device = device.to_string();
        self.config.baud_rate = baud_rate;
        self.config.bus_id = bus_id;
        self.identified = None;
        self.link = Some(Link {
            port,
            bus_id,
            bulk_registered: false,
        });
        debug!(device, baud_rate, bus_id, "connected");
        Ok(())
    }

    /// Connect with the device, baud rate and bus id from the configuration.
    pub fn connect_configured(&mut self) -> Result<()> {
        let device = self.config.device.clone();
        self.connect(&device, self.config.baud_rate, self.config.bus_id)
    }

    /// Release the port. Does nothing if not connected.
    ///
    /// Requests still on the wire are abandoned: their handles later yield
    /// [`ConnectorError::Abandoned`]. Results that were already read stay
    /// available. Returns the number of abandoned requests.
    pub fn disconnect(&mut self) -> usize {
        let Some(mut link) = self.link.take() else {
            return 0;
        };
        let (abandoned, owed) = self.queue.abandon_all();
        self.orphans.extend(owed);
        self.orphans.retain(|_, owed| !owed.release.is_released());
        if abandoned > 0 {
            warn!(abandoned, "disconnecting with undrained requests");
            metrics::counter!(metric_defs::REQUESTS_ABANDONED.name).increment(abandoned as u64);
        }
        link.port.close();
        self.pacer.reset();
        debug!(device = %self.config.device, "disconnected");
        abandoned
    }

    /// Connect, run `f`, and disconnect on every exit path, including panics.
    pub fn scoped<T>(
        &mut self,
        device: &str,
        baud_rate: u32,
        bus_id: u8,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.connect(device, baud_rate, bus_id)?;
        let mut session = Session(self);
        f(&mut *session)
    }

    // ------------------------------------------------------------------------
    // Pipeline
    // ------------------------------------------------------------------------

    /// Transmit a read of `name` and return its handle.
    pub fn read_field_async(&mut self, name: &str) -> Result<Handle> {
        if self.link.is_none() {
            return Err(ConnectorError::NotConnected);
        }
        let field = self
            .registry
            .get(name)
            .ok_or_else(|| ConnectorError::UnknownField(name.to_string()))?;
        let address = field.address;
        let request = InFlight {
            field: field.name.clone(),
            data_type: field.data_type,
            written: None,
        };
        self.transmit(address, request, None)
    }

    /// Transmit a write of `value` to `name` and return its handle.
    pub fn write_field_async(&mut self, name: &str, value: i64) -> Result<Handle> {
        if self.link.is_none() {
            return Err(ConnectorError::NotConnected);
        }
        let field = self
            .registry
            .get(name)
            .ok_or_else(|| ConnectorError::UnknownField(name.to_string()))?;
        if !field.writable {
            return Err(ConnectorError::NotWritable(name.to_string()));
        }
        let payload = field
            .encode(value)
            .map_err(|err| ConnectorError::from_table(name, err))?;
        let address = field.address;
        let request = InFlight {
            field: field.name.clone(),
            data_type: field.data_type,
            written: Some(value),
        };
        self.transmit(address, request, Some(payload))
    }

    /// Pace, send and enqueue.
    fn transmit(&mut self, address: u16, request: InFlight, payload: Option<Vec<u8>>) -> Result<Handle> {
        let link = self.link.as_mut().ok_or(ConnectorError::NotConnected)?;
        let kind = if payload.is_some() { "write" } else { "read" };
        let length = match &payload {
            Some(bytes) => bytes.len() as u16,
            None => request.expected_length(),
        };

        let waited = self.pacer.wait();
        metrics::histogram!(metric_defs::PACING_WAIT.name).record(waited.as_secs_f64());
        let sent = link
            .port
            .send_request(link.bus_id, address, length, payload.as_deref());
        self.pacer.mark();

        if let Err(failure) = sent {
            metrics::counter!(metric_defs::SEND_FAILURES.name, "kind" => kind).increment(1);
            debug!(field = %request.field, %failure, "transmission failed");
            return Err(ConnectorError::Communication(failure));
        }
        metrics::counter!(metric_defs::REQUESTS_SENT.name, "kind" => kind).increment(1);
        trace!(field = %request.field, address, length, kind, "sent");

        let (seq, release) = self.queue.push(request);
        Ok(Handle {
            owner: self.id,
            seq,
            release,
        })
    }

    /// Value for `handle`, draining earlier requests first if needed.
    ///
    /// For writes the value that was written is returned.
    pub fn result(&mut self, handle: Handle) -> Result<i64> {
        if handle.owner != self.id {
            return Err(ConnectorError::ForeignHandle);
        }
        if let Some(owed) = self.orphans.remove(&handle.seq) {
            return owed.outcome;
        }
        if self.link.is_none() {
            return Err(ConnectorError::NotConnected);
        }
        loop {
            match self.queue.take(handle.seq) {
                Lookup::Resolved(outcome) => return outcome,
                Lookup::InFlight => {
                    if !self.drain_next() {
                        return Err(ConnectorError::Abandoned);
                    }
                }
                Lookup::Unknown => return Err(ConnectorError::ForeignHandle),
            }
        }
    }

    /// Read `name` and wait for the value.
    pub fn read_field(&mut self, name: &str) -> Result<i64> {
        let handle = self.read_field_async(name)?;
        self.result(handle)
    }

    /// Write `value` to `name` and wait for the acknowledgement.
    pub fn write_field(&mut self, name: &str, value: i64) -> Result<()> {
        let handle = self.write_field_async(name, value)?;
        self.result(handle).map(|_| ())
    }

    /// Drain every outstanding response. Returns how many were read.
    pub fn flush(&mut self) -> usize {
        let mut drained = 0;
        while self.drain_next() {
            drained += 1;
        }
        drained
    }

    /// Requests transmitted but not yet drained.
    pub fn pending_count(&self) -> usize {
        self.queue.in_flight()
    }

    /// Give up on `handle`. Its response is still read off the bus in turn,
    /// then dropped.
    pub fn abandon(&mut self, handle: Handle) -> Result<()> {
        if handle.owner != self.id {
            return Err(ConnectorError::ForeignHandle);
        }
        if self.orphans.remove(&handle.seq).is_some() || self.queue.discard(handle.seq) {
            Ok(())
        } else {
            Err(ConnectorError::ForeignHandle)
        }
    }

    /// Read the model number and resolve it to a known gripper.
    ///
    /// The result is remembered until the next connect.
    pub fn identify(&mut self) -> Result<DeviceModel> {
        let raw = self.read_field(MODEL_NUMBER_FIELD)?;
        let model_number = u16::try_from(raw).ok();
        let model = model_number
            .and_then(DeviceModel::from_model_number)
            .ok_or(ConnectorError::UnsupportedDevice { model_number })?;
        self.identified = model_number;
        debug!(%model, "identified device");
        Ok(model)
    }

    /// Resolve the oldest undrained request. Returns `false` if there was none.
    pub(crate) fn drain_next(&mut self) -> bool {
        let (Some(link), Some(request)) = (self.link.as_mut(), self.queue.next_in_flight()) else {
            return false;
        };
        let outcome = receive(&mut link.port, link.bus_id, request, self.config.drain);
        let label = match &outcome {
            Ok(_) => "ok",
            Err(ConnectorError::Device(_)) => "device_error",
            Err(_) => "comm_error",
        };
        metrics::counter!(metric_defs::RESPONSES_DRAINED.name, "outcome" => label).increment(1);
        match &outcome {
            Ok(value) => trace!(field = %request.field, value, "drained"),
            Err(err @ ConnectorError::Device(_)) => warn!(field = %request.field, %err, "device error"),
            Err(err) => debug!(field = %request.field, %err, "drain failed"),
        }
        self.queue.resolve_next(outcome);
        true
    }

    // ------------------------------------------------------------------------
    // Internals shared with the group reader
    // ------------------------------------------------------------------------

    /// Bulk read the registered range, registering it on first use.
    pub(crate) fn bulk_transaction(&mut self, base_address: u16, length: u16) -> Result<RawResponse> {
        let link = self.link.as_mut().ok_or(ConnectorError::NotConnected)?;
        if !link.bulk_registered {
            link.port
                .register_bulk_read(link.bus_id, base_address, length)?;
            link.bulk_registered = true;
            debug!(bus_id = link.bus_id, base_address, length, "registered bulk read");
        }
        let waited = self.pacer.wait();
        metrics::histogram!(metric_defs::PACING_WAIT.name).record(waited.as_secs_f64());
        let response = link.port.bulk_read();
        self.pacer.mark();
        metrics::counter!(metric_defs::REQUESTS_SENT.name, "kind" => "bulk").increment(1);
        Ok(response?)
    }
}

impl<B: Bus> Drop for Connection<B> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl<B: Bus> std::fmt::Debug for Connection<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("connected", &self.connected())
            .field("pending", &self.queue.in_flight())
            .finish()
    }
}

/// Read one status packet and turn it into a value.
fn receive<P: Port>(port: &mut P, bus_id: u8, request: &InFlight, drain: DrainMode) -> Result<i64> {
    let expected_length = request.expected_length();
    let response = match drain {
        DrainMode::Blocking => port
            .receive_response(bus_id, expected_length, true)?
            .ok_or(CommFailure::RxTimeout)?,
        DrainMode::Polling {
            poll_interval_us,
            timeout_ms,
        } => {
            let deadline = Instant::now() + Duration::from_millis(timeout_ms);
            loop {
                if let Some(response) = port.receive_response(bus_id, expected_length, false)? {
                    break response;
                }
                if Instant::now() >= deadline {
                    return Err(CommFailure::RxTimeout.into());
                }
                thread::sleep(Duration::from_micros(poll_interval_us));
            }
        }
    };

    if !response.status.is_ok() {
        return Err(ConnectorError::Device(response.status));
    }
    match request.written {
        Some(value) => Ok(value),
        None => request
            .data_type
            .decode(&response.data)
            .ok_or(ConnectorError::Communication(CommFailure::RxCorrupt)),
    }
}

/// Disconnects the borrowed connection when dropped.
struct Session<'a, B: Bus>(&'a mut Connection<B>);

impl<B: Bus> Deref for Session<'_, B> {
    type Target = Connection<B>;

    fn deref(&self) -> &Connection<B> {
        self.0
    }
}

impl<B: Bus> DerefMut for Session<'_, B> {
    fn deref_mut(&mut self) -> &mut Connection<B> {
        self.0
    }
}

impl<B: Bus> Drop for Session<'_, B> {
    fn drop(&mut self) {
        self.0.disconnect();
    }
}

/// Build a connection from `config`, connect, run `f`, and disconnect.
pub fn with_connection<B: Bus, T>(
    bus: B,
    registry: FieldRegistry,
    config: ConnectionConfig,
    f: impl FnOnce(&mut Connection<B>) -> Result<T>,
) -> Result<T> {
    let mut connection = Connection::new(bus, registry, config);
    connection.connect_configured()?;
    let out = f(&mut connection);
    connection.disconnect();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhp12rn_sim::{SimBus, SimDevice};

    fn connection() -> (SimBus, Connection<SimBus>) {
        let bus = SimBus::new();
        bus.add_device(1, SimDevice::from_model(DeviceModel::RhP12RnA));
        let config = ConnectionConfig::default().with_min_tx_interval(Duration::ZERO);
        let conn = Connection::for_model(bus.clone(), DeviceModel::RhP12RnA, config);
        (bus, conn)
    }

    #[test]
    fn test_handles_are_not_interchangeable() {
        let (_bus, mut a) = connection();
        let (_bus2, mut b) = connection();
        a.connect("sim0", 57_600, 1).expect("connect");
        b.connect("sim0", 57_600, 1).expect("connect");

        let handle = a.read_field_async("model_number").expect("send");
        assert!(matches!(b.result(handle), Err(ConnectorError::ForeignHandle)));
        // a still has the response queued
        assert_eq!(a.pending_count(), 1);
        assert_eq!(a.flush(), 1);
    }

    #[test]
    fn test_connect_records_settings() {
        let (_bus, mut conn) = connection();
        conn.connect("/dev/sim7", 57_600, 1).expect("connect");
        assert_eq!(conn.config().device, "/dev/sim7");
        assert!(matches!(
            conn.connect("/dev/sim7", 57_600, 1),
            Err(ConnectorError::AlreadyConnected)
        ));
    }

    #[test]
    fn test_scoped_disconnects_on_error() {
        let (bus, mut conn) = connection();
        let out: Result<()> = conn.scoped("sim0", 57_600, 1, |conn| {
            conn.read_field("model_number")?;
            conn.read_field("no_such_field")?;
            Ok(())
        });
        assert!(matches!(out, Err(ConnectorError::UnknownField(_))));
        assert!(!conn.connected());
        assert_eq!(bus.open_ports(), 0);
    }

    #[test]
    fn test_dropped_handles_do_not_accumulate() {
        let (_bus, mut conn) = connection();
        conn.connect("sim0", 57_600, 1).expect("connect");

        let forgotten = conn.read_field_async("model_number").expect("send");
        assert_eq!(conn.flush(), 1);
        drop(forgotten);
        for _ in 0..200 {
            conn.read_field("id").expect("read");
        }
        assert_eq!(conn.queue.retained(), 0);

        let _ = conn.read_field_async("id").expect("send");
        let kept = conn.read_field_async("model_number").expect("send");
        assert_eq!(conn.disconnect(), 1);
        assert_eq!(conn.orphans.len(), 1);
        assert!(matches!(conn.result(kept), Err(ConnectorError::Abandoned)));
        assert!(conn.orphans.is_empty());
    }

    #[test]
    fn test_drop_releases_port() {
        let (bus, mut conn) = connection();
        conn.connect("sim0", 57_600, 1).expect("connect");
        let _ = conn.read_field_async("model_number").expect("send");
        drop(conn);
        assert_eq!(bus.open_ports(), 0);
    }
}
