//! Name → field lookup table.

use crate::{ControlTableError, Field, Result};
use std::collections::HashMap;

/// Read-only mapping from field name to [`Field`].
///
/// Iteration order is the order in which fields were supplied.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: Vec<Field>,
    by_name: HashMap<String, usize>,
}

impl FieldRegistry {
    /// Build a registry from a list of fields.
    ///
    /// If two fields share a name, the later one wins.
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        let mut registry = FieldRegistry::default();
        for field in fields {
            match registry.by_name.get(&field.name) {
                Some(&index) => registry.fields[index] = field,
                None => {
                    registry
                        .by_name
                        .insert(field.name.clone(), registry.fields.len());
                    registry.fields.push(field);
                }
            }
        }
        registry
    }

    /// Build a registry, rejecting duplicate names.
    pub fn try_new(fields: impl IntoIterator<Item = Field>) -> Result<Self> {
        let mut registry = FieldRegistry::default();
        for field in fields {
            if registry.by_name.contains_key(&field.name) {
                return Err(ControlTableError::DuplicateField(field.name));
            }
            registry
                .by_name
                .insert(field.name.clone(), registry.fields.len());
            registry.fields.push(field);
        }
        Ok(registry)
    }

    /// Load a field table from a YAML sequence of field records.
    ///
    /// ```yaml
    /// - address: 0
    ///   data_type: u16
    ///   name: model_number
    ///   description: Model Number
    /// - address: 550
    ///   data_type: s16
    ///   name: goal_current
    ///   writable: true
    ///   initial_value: 0
    /// ```
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let fields: Vec<Field> = serde_yaml::from_str(yaml)?;
        Self::try_new(fields)
    }

    /// Serialize the table back to YAML.
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.fields)?)
    }

    /// Look up a field by name.
    pub fn lookup(&self, name: &str) -> Result<&Field> {
        self.get(name)
            .ok_or_else(|| ControlTableError::UnknownField(name.to_string()))
    }

    /// Look up a field by name, returning `None` if absent.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.by_name.get(name).map(|&index| &self.fields[index])
    }

    /// Whether the named field exists and is writable.
    pub fn is_writable(&self, name: &str) -> bool {
        self.get(name).is_some_and(|field| field.writable)
    }

    /// Whether the named field exists.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Iterate over all fields in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the registry has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<Field> for FieldRegistry {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        FieldRegistry::new(iter)
    }
}
