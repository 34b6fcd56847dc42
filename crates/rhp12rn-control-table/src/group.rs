//! Bulk read layouts.
//!
//! A group read fetches one contiguous address range in a single transaction
//! and slices several fields out of the response:
//!
//! ```text
//! base_address                                      base_address + length
//! |  tick  |mv|ms|  pwm  |current|   velocity   |   position    |
//! +--------+--+--+-------+-------+--------------+---------------+
//!  0        2  3  4       6       8              12              16
//! ```

use crate::{ControlTableError, DataType, Result};
use std::collections::BTreeMap;

/// Values decoded from one group read, keyed by field name.
pub type GroupValues = BTreeMap<String, i64>;

/// One field inside a group layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    /// Field name in the decoded output.
    pub name: String,
    /// Byte offset from the layout's base address.
    pub offset: u16,
    /// Wire type.
    pub data_type: DataType,
}

/// A fixed bulk read covering `[base_address, base_address + length)`.
///
/// Layouts are tied to one device model because the addresses are only
/// valid for that model's control table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLayout {
    /// Model number the addresses are valid for.
    pub model_number: u16,
    /// First address of the range.
    pub base_address: u16,
    /// Number of bytes in the range.
    pub length: u16,
    /// Fields extracted from the range.
    pub entries: Vec<GroupEntry>,
}

impl GroupLayout {
    /// Create an empty layout.
    pub fn new(model_number: u16, base_address: u16, length: u16) -> Self {
        GroupLayout {
            model_number,
            base_address,
            length,
            entries: Vec::new(),
        }
    }

    /// Add an entry at `offset` bytes from the base address.
    pub fn with_entry(mut self, name: impl Into<String>, offset: u16, data_type: DataType) -> Self {
        self.entries.push(GroupEntry {
            name: name.into(),
            offset,
            data_type,
        });
        self
    }

    /// Check that every entry lies inside the range.
    pub fn validate(&self) -> Result<()> {
        for entry in &self.entries {
            let end = usize::from(entry.offset) + entry.data_type.size();
            if end > usize::from(self.length) {
                return Err(ControlTableError::EntryOutOfBounds {
                    name: entry.name.clone(),
                    offset: entry.offset,
                    length: self.length,
                });
            }
        }
        Ok(())
    }

    /// Decode every entry from a bulk response.
    pub fn decode(&self, data: &[u8]) -> Result<GroupValues> {
        if data.len() < usize::from(self.length) {
            return Err(ControlTableError::ShortData {
                expected: usize::from(self.length),
                actual: data.len(),
            });
        }
        let mut values = GroupValues::new();
        for entry in &self.entries {
            let start = usize::from(entry.offset);
            let value = data
                .get(start..)
                .and_then(|rest| entry.data_type.decode(rest))
                .ok_or_else(|| ControlTableError::EntryOutOfBounds {
                    name: entry.name.clone(),
                    offset: entry.offset,
                    length: self.length,
                })?;
            values.insert(entry.name.clone(), value);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> GroupLayout {
        GroupLayout::new(35074, 568, 16)
            .with_entry("realtime_tick", 0, DataType::U16)
            .with_entry("present_current", 6, DataType::S16)
            .with_entry("present_velocity", 8, DataType::S32)
            .with_entry("present_position", 12, DataType::S32)
    }

    #[test]
    fn test_decode_signed_extremes() {
        let mut data = vec![0u8; 16];
        data[0..2].copy_from_slice(&0x1234u16.to_le_bytes());
        data[6..8].copy_from_slice(&0x8000u16.to_le_bytes());
        data[8..12].copy_from_slice(&0x8000_0000u32.to_le_bytes());
        data[12..16].copy_from_slice(&740u32.to_le_bytes());

        let values = layout().decode(&data).expect("should decode");
        assert_eq!(values["realtime_tick"], 0x1234);
        assert_eq!(values["present_current"], -32768);
        assert_eq!(values["present_velocity"], -2_147_483_648);
        assert_eq!(values["present_position"], 740);
    }

    #[test]
    fn test_decode_short_response() {
        let err = layout().decode(&[0u8; 10]).expect_err("too short");
        assert!(matches!(
            err,
            ControlTableError::ShortData { expected: 16, actual: 10 }
        ));
    }

    #[test]
    fn test_validate() {
        assert!(layout().validate().is_ok());
        let bad = layout().with_entry("overflow", 14, DataType::U32);
        assert!(matches!(
            bad.validate(),
            Err(ControlTableError::EntryOutOfBounds { offset: 14, .. })
        ));
    }
}
