//! Device status byte.

use crate::constants::*;

/// Kind of error encoded in a status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    /// Failed to process the instruction.
    ResultFail,
    /// Undefined instruction.
    Instruction,
    /// Checksum mismatch.
    Crc,
    /// Data out of range.
    DataRange,
    /// Data length mismatch.
    DataLength,
    /// Data outside the configured limit.
    DataLimit,
    /// Access violation.
    Access,
    /// Unknown error number.
    Unknown(u8),
}

impl std::fmt::Display for DeviceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceErrorKind::ResultFail => write!(f, "failed to process the instruction packet"),
            DeviceErrorKind::Instruction => write!(f, "undefined instruction or action without reg_write"),
            DeviceErrorKind::Crc => write!(f, "CRC doesn't match"),
            DeviceErrorKind::DataRange => write!(f, "data is out of range"),
            DeviceErrorKind::DataLength => write!(f, "data is shorter than the field length"),
            DeviceErrorKind::DataLimit => write!(f, "data is out of the limit"),
            DeviceErrorKind::Access => write!(f, "access violation"),
            DeviceErrorKind::Unknown(num) => write!(f, "unknown error number {}", num),
        }
    }
}

/// The error byte of a status packet.
///
/// Zero means success. The high bit flags a pending hardware alert; the low
/// seven bits carry an error number. The raw byte is always preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceStatus(pub u8);

impl DeviceStatus {
    /// Status of a successful transaction.
    pub const OK: DeviceStatus = DeviceStatus(0);

    /// Wrap a raw status byte.
    pub const fn new(code: u8) -> Self {
        DeviceStatus(code)
    }

    /// Raw byte as received.
    pub const fn code(self) -> u8 {
        self.0
    }

    /// Whether the transaction succeeded.
    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Whether the device has a hardware alert pending.
    pub const fn alert(self) -> bool {
        self.0 & ERRBIT_ALERT != 0
    }

    /// Error number, if any.
    pub fn kind(self) -> Option<DeviceErrorKind> {
        let num = self.0 & ERRNUM_MASK;
        let kind = match num {
            0 => return None,
            ERRNUM_RESULT_FAIL => DeviceErrorKind::ResultFail,
            ERRNUM_INSTRUCTION => DeviceErrorKind::Instruction,
            ERRNUM_CRC => DeviceErrorKind::Crc,
            ERRNUM_DATA_RANGE => DeviceErrorKind::DataRange,
            ERRNUM_DATA_LENGTH => DeviceErrorKind::DataLength,
            ERRNUM_DATA_LIMIT => DeviceErrorKind::DataLimit,
            ERRNUM_ACCESS => DeviceErrorKind::Access,
            other => DeviceErrorKind::Unknown(other),
        };
        Some(kind)
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.kind(), self.alert()) {
            (None, false) => write!(f, "ok"),
            (None, true) => write!(f, "hardware error alert (0x{:02X})", self.0),
            (Some(kind), false) => write!(f, "{} (0x{:02X})", kind, self.0),
            (Some(kind), true) => write!(f, "{}, hardware error alert (0x{:02X})", kind, self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok() {
        assert!(DeviceStatus::OK.is_ok());
        assert_eq!(DeviceStatus::OK.kind(), None);
        assert_eq!(DeviceStatus::OK.to_string(), "ok");
    }

    #[test]
    fn test_access_error() {
        let status = DeviceStatus::new(ERRNUM_ACCESS);
        assert!(!status.is_ok());
        assert!(!status.alert());
        assert_eq!(status.kind(), Some(DeviceErrorKind::Access));
        assert_eq!(status.to_string(), "access violation (0x07)");
    }

    #[test]
    fn test_alert_keeps_raw_code() {
        let status = DeviceStatus::new(ERRBIT_ALERT | ERRNUM_DATA_LIMIT);
        assert!(status.alert());
        assert_eq!(status.code(), 0x86);
        assert_eq!(status.kind(), Some(DeviceErrorKind::DataLimit));

        let alert_only = DeviceStatus::new(ERRBIT_ALERT);
        assert!(!alert_only.is_ok());
        assert_eq!(alert_only.kind(), None);
        assert!(alert_only.to_string().contains("alert"));
    }

    #[test]
    fn test_unknown_number() {
        assert_eq!(
            DeviceStatus::new(0x2A).kind(),
            Some(DeviceErrorKind::Unknown(0x2A))
        );
    }
}
