//! A single control table field.

use crate::{DataType, Result};
use serde::{Deserialize, Serialize};

/// A named register on the device.
///
/// Fields are built once when a registry is created and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Start address in the control table.
    pub address: u16,
    /// Width and signedness on the wire.
    pub data_type: DataType,
    /// Unique name, used for lookups.
    pub name: String,
    /// Human readable description.
    #[serde(default)]
    pub description: String,
    /// Whether the host may write this field.
    #[serde(default)]
    pub writable: bool,
    /// Factory default, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<i64>,
}

impl Field {
    /// Create a read-only field.
    pub fn new(
        address: u16,
        data_type: DataType,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Field {
            address,
            data_type,
            name: name.into(),
            description: description.into(),
            writable: false,
            initial_value: None,
        }
    }

    /// Mark the field as writable.
    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }

    /// Set the factory default.
    pub fn with_initial_value(mut self, value: i64) -> Self {
        self.initial_value = Some(value);
        self
    }

    /// Number of bytes this field occupies.
    pub fn size(&self) -> u16 {
        self.data_type.size() as u16
    }

    /// Encode a value for this field.
    pub fn encode(&self, value: i64) -> Result<Vec<u8>> {
        self.data_type.encode(value)
    }

    /// Decode response bytes for this field.
    pub fn decode(&self, bytes: &[u8]) -> Option<i64> {
        self.data_type.decode(bytes)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} @ {} ({}, {})",
            self.name,
            self.address,
            self.data_type,
            if self.writable { "rw" } else { "r" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let field = Field::new(550, DataType::S16, "goal_current", "Goal Current")
            .writable()
            .with_initial_value(0);
        assert_eq!(field.size(), 2);
        assert!(field.writable);
        assert_eq!(field.initial_value, Some(0));
        assert_eq!(field.to_string(), "goal_current @ 550 (s16, rw)");
    }

    #[test]
    fn test_deserialize_defaults() {
        let yaml = "address: 0\ndata_type: u16\nname: model_number\n";
        let field: Field = serde_yaml::from_str(yaml).expect("should parse");
        assert_eq!(field.name, "model_number");
        assert!(!field.writable);
        assert!(field.description.is_empty());
        assert_eq!(field.initial_value, None);
    }
}
