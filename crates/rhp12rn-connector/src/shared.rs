//! Thread-safe connection handle.

use crate::{Connection, Handle, Result};
use parking_lot::{Mutex, MutexGuard};
use rhp12rn_control_table::GroupValues;
use rhp12rn_transport::Bus;
use std::sync::Arc;

/// A [`Connection`] behind one lock.
///
/// Every operation holds the lock for its whole duration, so the queue and
/// the port are never touched by two threads at once. Clones share the
/// same connection.
pub struct SharedConnection<B: Bus> {
    inner: Arc<Mutex<Connection<B>>>,
}

impl<B: Bus> Clone for SharedConnection<B> {
    fn clone(&self) -> Self {
        SharedConnection {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Bus> SharedConnection<B> {
    /// Wrap a connection.
    pub fn new(connection: Connection<B>) -> Self {
        SharedConnection {
            inner: Arc::new(Mutex::new(connection)),
        }
    }

    /// Lock for a sequence of operations.
    pub fn lock(&self) -> MutexGuard<'_, Connection<B>> {
        self.inner.lock()
    }

    /// See [`Connection::connected`].
    pub fn connected(&self) -> bool {
        self.inner.lock().connected()
    }

    /// See [`Connection::connect`].
    pub fn connect(&self, device: &str, baud_rate: u32, bus_id: u8) -> Result<()> {
        self.inner.lock().connect(device, baud_rate, bus_id)
    }

    /// See [`Connection::disconnect`].
    pub fn disconnect(&self) -> usize {
        self.inner.lock().disconnect()
    }

    /// See [`Connection::read_field_async`].
    pub fn read_field_async(&self, name: &str) -> Result<Handle> {
        self.inner.lock().read_field_async(name)
    }

    /// See [`Connection::write_field_async`].
    pub fn write_field_async(&self, name: &str, value: i64) -> Result<Handle> {
        self.inner.lock().write_field_async(name, value)
    }

    /// See [`Connection::result`].
    pub fn result(&self, handle: Handle) -> Result<i64> {
        self.inner.lock().result(handle)
    }

    /// See [`Connection::read_field`].
    pub fn read_field(&self, name: &str) -> Result<i64> {
        self.inner.lock().read_field(name)
    }

    /// See [`Connection::write_field`].
    pub fn write_field(&self, name: &str, value: i64) -> Result<()> {
        self.inner.lock().write_field(name, value)
    }

    /// See [`Connection::group_read`].
    pub fn group_read(&self) -> Result<GroupValues> {
        self.inner.lock().group_read()
    }

    /// See [`Connection::flush`].
    pub fn flush(&self) -> usize {
        self.inner.lock().flush()
    }

    /// See [`Connection::pending_count`].
    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending_count()
    }
}
