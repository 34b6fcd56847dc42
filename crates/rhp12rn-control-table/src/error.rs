//! Error types for the control table crate.

use crate::DataType;
use thiserror::Error;

/// Errors that can occur when working with control tables.
#[derive(Debug, Error)]
pub enum ControlTableError {
    /// No field with this name exists in the registry.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Two fields in a strictly-loaded table share a name.
    #[error("duplicate field name: {0}")]
    DuplicateField(String),

    /// Value does not fit the declared wire type.
    #[error("value {value} does not fit {data_type} (range {min}..={max})", min = .data_type.min(), max = .data_type.max())]
    ValueOutOfRange {
        /// Value that was rejected.
        value: i64,
        /// Declared wire type.
        data_type: DataType,
    },

    /// Raw data is shorter than the layout requires.
    #[error("short data: expected {expected} bytes, got {actual}")]
    ShortData {
        /// Bytes required.
        expected: usize,
        /// Bytes received.
        actual: usize,
    },

    /// A group entry extends past the end of its bulk range.
    #[error("group entry {name} at offset {offset} does not fit in {length} bytes")]
    EntryOutOfBounds {
        /// Entry name.
        name: String,
        /// Entry offset from the base address.
        offset: u16,
        /// Length of the bulk range.
        length: u16,
    },

    /// YAML parsing error while loading a field table.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ControlTableError::ValueOutOfRange {
            value: 40000,
            data_type: DataType::S16,
        };
        assert_eq!(
            err.to_string(),
            "value 40000 does not fit s16 (range -32768..=32767)"
        );

        let err = ControlTableError::UnknownField("goal_torque".to_string());
        assert!(err.to_string().contains("goal_torque"));
    }
}
