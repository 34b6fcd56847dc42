//! Protocol constants
//!
//! Communication result codes and status error numbers as used by the
//! Dynamixel SDK and the Protocol 2.0 status packet.

// ============================================================================
// Bus IDs
// ============================================================================

/// Broadcast id (all devices act, none reply to writes).
pub const BROADCAST_ID: u8 = 0xFE;
/// Highest id a single device may use.
pub const MAX_ID: u8 = 0xFC;

// ============================================================================
// Communication Results (SDK `COMM_*`)
// ============================================================================

/// Transaction completed.
pub const COMM_SUCCESS: i32 = 0;
/// Port is in use by another transaction.
pub const COMM_PORT_BUSY: i32 = -1000;
/// Failed to transmit the instruction packet.
pub const COMM_TX_FAIL: i32 = -1001;
/// Failed to receive the status packet.
pub const COMM_RX_FAIL: i32 = -1002;
/// Instruction packet is malformed.
pub const COMM_TX_ERROR: i32 = -2000;
/// Status packet is still being received.
pub const COMM_RX_WAITING: i32 = -3000;
/// No status packet within the timeout.
pub const COMM_RX_TIMEOUT: i32 = -3001;
/// Status packet failed its checksum or framing.
pub const COMM_RX_CORRUPT: i32 = -3002;
/// Operation not available for this protocol or port.
pub const COMM_NOT_AVAILABLE: i32 = -9000;

// ============================================================================
// Status Packet Error Byte
// ============================================================================

/// Set when the device has a hardware error pending.
pub const ERRBIT_ALERT: u8 = 0x80;
/// Mask for the error number in the low bits.
pub const ERRNUM_MASK: u8 = 0x7F;

/// Failed to process the instruction.
pub const ERRNUM_RESULT_FAIL: u8 = 1;
/// Undefined instruction, or action without reg_write.
pub const ERRNUM_INSTRUCTION: u8 = 2;
/// Checksum mismatch.
pub const ERRNUM_CRC: u8 = 3;
/// Data out of range.
pub const ERRNUM_DATA_RANGE: u8 = 4;
/// Data shorter than the field.
pub const ERRNUM_DATA_LENGTH: u8 = 5;
/// Data outside the configured limit.
pub const ERRNUM_DATA_LIMIT: u8 = 6;
/// Write to a read-only field, read from a write-only field, or EEPROM write
/// with torque enabled.
pub const ERRNUM_ACCESS: u8 = 7;
