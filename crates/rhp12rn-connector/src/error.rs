//! Connector error types.

use rhp12rn_control_table::{ControlTableError, DataType};
use rhp12rn_transport::{CommFailure, DeviceStatus, TransportError};
use thiserror::Error;

/// Errors raised by a [`Connection`](crate::Connection).
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// The port could not be opened or configured.
    #[error("failed to connect to {device}: {source}")]
    Connection {
        /// Device path.
        device: String,
        /// Underlying transport error.
        #[source]
        source: TransportError,
    },

    /// The operation needs an open connection.
    #[error("not connected")]
    NotConnected,

    /// `connect` was called on an open connection.
    #[error("already connected")]
    AlreadyConnected,

    /// No field with this name is registered.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// The field is read-only.
    #[error("field {0} is not writable")]
    NotWritable(String),

    /// The value does not fit the field's wire type.
    #[error("value {value} cannot be encoded as {data_type} for field {field}")]
    Encoding {
        /// Field name.
        field: String,
        /// Rejected value.
        value: i64,
        /// Wire type of the field.
        data_type: DataType,
    },

    /// The transaction failed on the wire.
    #[error("communication error: {0}")]
    Communication(#[from] CommFailure),

    /// The device answered with a nonzero status byte.
    #[error("device error: {0}")]
    Device(DeviceStatus),

    /// The operation is not available for this device model.
    #[error("unsupported device (model number {})", display_model(.model_number))]
    UnsupportedDevice {
        /// Model number of the connected device, if known.
        model_number: Option<u16>,
    },

    /// The request was dropped by a disconnect before its response was read.
    #[error("request abandoned by disconnect")]
    Abandoned,

    /// The handle was issued by a different connection.
    #[error("handle does not belong to this connection")]
    ForeignHandle,

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_yaml::Error),
}

fn display_model(model_number: &Option<u16>) -> String {
    match model_number {
        Some(number) => number.to_string(),
        None => "unknown".to_string(),
    }
}

impl ConnectorError {
    /// Whether the error was reported by the device itself.
    pub fn is_device_error(&self) -> bool {
        matches!(self, ConnectorError::Device(_))
    }

    /// Whether the error is a wire-level failure.
    pub fn is_communication_error(&self) -> bool {
        matches!(self, ConnectorError::Communication(_))
    }

    /// Attach a field name to a control table error.
    pub(crate) fn from_table(field: &str, err: ControlTableError) -> Self {
        match err {
            ControlTableError::ValueOutOfRange { value, data_type } => ConnectorError::Encoding {
                field: field.to_string(),
                value,
                data_type,
            },
            ControlTableError::UnknownField(name) => ConnectorError::UnknownField(name),
            ControlTableError::ShortData { .. } | ControlTableError::EntryOutOfBounds { .. } => {
                ConnectorError::Communication(CommFailure::RxCorrupt)
            }
            _ => ConnectorError::UnknownField(field.to_string()),
        }
    }
}
