//! Transport error types.

use thiserror::Error;

/// Errors opening or configuring a port.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The port could not be opened.
    #[error("failed to open port {device}: {reason}")]
    OpenFailed {
        /// Device path.
        device: String,
        /// Reason given by the driver.
        reason: String,
    },

    /// The port rejected the baud rate.
    #[error("failed to set baud rate {0}")]
    BaudRateRejected(u32),
}

/// Communication failure during a transaction.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommFailure {
    /// Port is in use.
    #[error("port is in use")]
    PortBusy,
    /// Failed to transmit the instruction packet.
    #[error("failed to transmit instruction packet")]
    TxFail,
    /// Failed to receive the status packet.
    #[error("failed to get status packet from device")]
    RxFail,
    /// Instruction packet is malformed.
    #[error("incorrect instruction packet")]
    TxError,
    /// Status packet not fully received yet.
    #[error("now receiving status packet")]
    RxWaiting,
    /// No status packet within the timeout.
    #[error("no status packet")]
    RxTimeout,
    /// Status packet is corrupt.
    #[error("incorrect status packet")]
    RxCorrupt,
    /// Operation not available.
    #[error("operation not available")]
    NotAvailable,
}

impl CommFailure {
    /// Map an SDK `COMM_*` code to a failure.
    ///
    /// Returns `None` for [`COMM_SUCCESS`](crate::COMM_SUCCESS). Unknown
    /// negative codes map to [`CommFailure::RxFail`].
    pub fn from_code(code: i32) -> Option<Self> {
        use crate::constants::*;
        match code {
            COMM_SUCCESS => None,
            COMM_PORT_BUSY => Some(CommFailure::PortBusy),
            COMM_TX_FAIL => Some(CommFailure::TxFail),
            COMM_RX_FAIL => Some(CommFailure::RxFail),
            COMM_TX_ERROR => Some(CommFailure::TxError),
            COMM_RX_WAITING => Some(CommFailure::RxWaiting),
            COMM_RX_TIMEOUT => Some(CommFailure::RxTimeout),
            COMM_RX_CORRUPT => Some(CommFailure::RxCorrupt),
            COMM_NOT_AVAILABLE => Some(CommFailure::NotAvailable),
            _ => Some(CommFailure::RxFail),
        }
    }

    /// The SDK `COMM_*` code for this failure.
    pub fn code(self) -> i32 {
        use crate::constants::*;
        match self {
            CommFailure::PortBusy => COMM_PORT_BUSY,
            CommFailure::TxFail => COMM_TX_FAIL,
            CommFailure::RxFail => COMM_RX_FAIL,
            CommFailure::TxError => COMM_TX_ERROR,
            CommFailure::RxWaiting => COMM_RX_WAITING,
            CommFailure::RxTimeout => COMM_RX_TIMEOUT,
            CommFailure::RxCorrupt => COMM_RX_CORRUPT,
            CommFailure::NotAvailable => COMM_NOT_AVAILABLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;

    #[test]
    fn test_comm_code_roundtrip() {
        let failures = [
            CommFailure::PortBusy,
            CommFailure::TxFail,
            CommFailure::RxFail,
            CommFailure::TxError,
            CommFailure::RxWaiting,
            CommFailure::RxTimeout,
            CommFailure::RxCorrupt,
            CommFailure::NotAvailable,
        ];
        for failure in failures {
            assert_eq!(CommFailure::from_code(failure.code()), Some(failure));
        }
        assert_eq!(CommFailure::from_code(COMM_SUCCESS), None);
        assert_eq!(CommFailure::from_code(-42), Some(CommFailure::RxFail));
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::OpenFailed {
            device: "/dev/ttyUSB0".to_string(),
            reason: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to open port /dev/ttyUSB0: permission denied"
        );
        assert_eq!(CommFailure::RxTimeout.to_string(), "no status packet");
    }
}
