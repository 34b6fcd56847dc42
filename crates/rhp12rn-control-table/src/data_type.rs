//! Wire types and the encode/decode rules.
//!
//! Every field is transferred as an unsigned little-endian integer of 1, 2 or
//! 4 bytes. Signed fields are stored in two's complement: a raw value at or
//! above the midpoint of its width (e.g. `0x8000` for 16 bits) represents
//! `raw - 2^bits`.

use crate::{ControlTableError, Result};
use serde::{Deserialize, Serialize};

/// Width and signedness of a field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Unsigned 8-bit.
    U8,
    /// Unsigned 16-bit.
    U16,
    /// Unsigned 32-bit.
    U32,
    /// Signed 8-bit.
    S8,
    /// Signed 16-bit.
    S16,
    /// Signed 32-bit.
    S32,
}

impl DataType {
    /// Number of bytes on the wire.
    pub const fn size(self) -> usize {
        match self {
            DataType::U8 | DataType::S8 => 1,
            DataType::U16 | DataType::S16 => 2,
            DataType::U32 | DataType::S32 => 4,
        }
    }

    /// Whether raw values are reinterpreted as two's complement.
    pub const fn is_signed(self) -> bool {
        matches!(self, DataType::S8 | DataType::S16 | DataType::S32)
    }

    /// `2^bits` for this width.
    const fn modulus(self) -> i64 {
        1i64 << (self.size() * 8)
    }

    /// Smallest value representable by this type.
    pub const fn min(self) -> i64 {
        if self.is_signed() {
            -(self.modulus() / 2)
        } else {
            0
        }
    }

    /// Largest value representable by this type.
    pub const fn max(self) -> i64 {
        if self.is_signed() {
            self.modulus() / 2 - 1
        } else {
            self.modulus() - 1
        }
    }

    /// Parse a Python `struct` format character (`B`, `H`, `I`, `b`, `h`, `i`).
    ///
    /// Field tables exported from older tooling use these characters.
    pub fn from_format_char(c: char) -> Option<Self> {
        match c {
            'B' => Some(DataType::U8),
            'H' => Some(DataType::U16),
            'I' => Some(DataType::U32),
            'b' => Some(DataType::S8),
            'h' => Some(DataType::S16),
            'i' => Some(DataType::S32),
            _ => None,
        }
    }

    /// Convert a value to the unsigned wire representation.
    pub fn to_raw(self, value: i64) -> Result<u32> {
        if value < self.min() || value > self.max() {
            return Err(ControlTableError::ValueOutOfRange {
                value,
                data_type: self,
            });
        }
        let raw = if value < 0 {
            value + self.modulus()
        } else {
            value
        };
        // In range by the check above, so the raw value fits in 32 bits.
        Ok(raw as u32)
    }

    /// Reinterpret an unsigned wire value according to this type.
    ///
    /// Bits above the type's width are ignored.
    pub fn from_raw(self, raw: u32) -> i64 {
        let raw = i64::from(raw) & (self.modulus() - 1);
        if self.is_signed() && raw >= self.modulus() / 2 {
            raw - self.modulus()
        } else {
            raw
        }
    }

    /// Encode a value into little-endian wire bytes.
    pub fn encode(self, value: i64) -> Result<Vec<u8>> {
        let raw = self.to_raw(value)?;
        Ok(raw.to_le_bytes()[..self.size()].to_vec())
    }

    /// Decode little-endian wire bytes.
    ///
    /// Returns `None` if fewer than [`size`](Self::size) bytes are given.
    /// Extra trailing bytes are ignored.
    pub fn decode(self, bytes: &[u8]) -> Option<i64> {
        let bytes = bytes.get(..self.size())?;
        let mut raw = [0u8; 4];
        raw[..bytes.len()].copy_from_slice(bytes);
        Some(self.from_raw(u32::from_le_bytes(raw)))
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataType::U8 => "u8",
            DataType::U16 => "u16",
            DataType::U32 => "u32",
            DataType::S8 => "s8",
            DataType::S16 => "s16",
            DataType::S32 => "s32",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges() {
        assert_eq!(DataType::U8.max(), 255);
        assert_eq!(DataType::S8.min(), -128);
        assert_eq!(DataType::S16.min(), -32768);
        assert_eq!(DataType::S16.max(), 32767);
        assert_eq!(DataType::U32.max(), 4_294_967_295);
        assert_eq!(DataType::S32.min(), -2_147_483_648);
    }

    #[test]
    fn test_signed_reinterpretation() {
        assert_eq!(DataType::S16.from_raw(0xFFFF), -1);
        assert_eq!(DataType::S32.from_raw(0xFFFF_FFFF), -1);
        assert_eq!(DataType::S16.from_raw(0x7FFF), 32767);
        assert_eq!(DataType::S16.from_raw(0x8000), -32768);
        assert_eq!(DataType::S32.from_raw(0x8000_0000), -2_147_483_648);
        assert_eq!(DataType::S8.from_raw(0x80), -128);
    }

    #[test]
    fn test_unsigned_is_not_reinterpreted() {
        assert_eq!(DataType::U16.from_raw(0xFFFF), 65535);
        assert_eq!(DataType::U16.from_raw(0x8901), 35073);
        assert_eq!(DataType::U32.from_raw(0x8000_0000), 2_147_483_648);
    }

    #[test]
    fn test_from_raw_masks_high_bits() {
        assert_eq!(DataType::U8.from_raw(0x1FF), 0xFF);
        assert_eq!(DataType::S8.from_raw(0x1FF), -1);
    }

    #[test]
    fn test_s16_inverse_over_full_range() {
        for value in DataType::S16.min()..=DataType::S16.max() {
            let bytes = DataType::S16.encode(value).expect("in range");
            assert_eq!(bytes.len(), 2);
            assert_eq!(DataType::S16.decode(&bytes), Some(value));
        }
    }

    #[test]
    fn test_s16_out_of_range() {
        for value in [-32769, 32768, i64::MIN, i64::MAX] {
            let err = DataType::S16.encode(value).expect_err("out of range");
            assert!(matches!(
                err,
                ControlTableError::ValueOutOfRange { data_type: DataType::S16, .. }
            ));
        }
    }

    #[test]
    fn test_negative_current_wire_value() {
        assert_eq!(DataType::S16.to_raw(-50).expect("in range"), 65486);
        assert_eq!(DataType::S16.from_raw(65486), -50);
    }

    #[test]
    fn test_unsigned_rejects_negative() {
        assert!(DataType::U8.encode(-1).is_err());
        assert!(DataType::U32.encode(-1).is_err());
        assert_eq!(
            DataType::U32.encode(4_294_967_295).expect("in range"),
            vec![0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_decode_short_and_long_input() {
        assert_eq!(DataType::U16.decode(&[0x01]), None);
        assert_eq!(DataType::U16.decode(&[0x01, 0x89, 0xAA]), Some(35073));
        assert_eq!(DataType::S32.decode(&[0x00, 0x00, 0x00, 0x80]), Some(-2_147_483_648));
    }

    #[test]
    fn test_format_chars() {
        assert_eq!(DataType::from_format_char('H'), Some(DataType::U16));
        assert_eq!(DataType::from_format_char('i'), Some(DataType::S32));
        assert_eq!(DataType::from_format_char('q'), None);
    }

    #[test]
    fn test_serde_names() {
        let ty: DataType = serde_yaml::from_str("s16").expect("should parse");
        assert_eq!(ty, DataType::S16);
        assert_eq!(ty.to_string(), "s16");
    }
}
