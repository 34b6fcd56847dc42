//! # rhp12rn-control-table
//!
//! Control table types for ROBOTIS RH-P12-RN and RH-P12-RN(A) grippers.
//!
//! A Dynamixel device exposes its configuration and state as a flat table of
//! registers ("fields"). Each field lives at a fixed address, has a fixed wire
//! width and signedness, and is either read-only or writable. This crate
//! provides:
//!
//! - [`DataType`] - wire width/signedness and the encode/decode rules
//! - [`Field`] - a single named register
//! - [`FieldRegistry`] - name → field lookup, built once per device
//! - [`GroupLayout`] - a contiguous bulk read covering several fields
//! - [`DeviceModel`] - the built-in register maps for the supported grippers
//!
//! ## Example
//!
//! ```
//! use rhp12rn_control_table::{DataType, DeviceModel};
//!
//! let registry = DeviceModel::RhP12RnA.registry();
//! let field = registry.lookup("goal_current")?;
//! assert_eq!(field.data_type, DataType::S16);
//!
//! let bytes = field.data_type.encode(-50)?;
//! assert_eq!(bytes, vec![0xCE, 0xFF]);
//! assert_eq!(field.data_type.decode(&bytes), Some(-50));
//! # Ok::<(), rhp12rn_control_table::ControlTableError>(())
//! ```

mod data_type;
mod error;
mod field;
mod group;
mod models;
mod registry;

pub use data_type::DataType;
pub use error::ControlTableError;
pub use field::Field;
pub use group::{GroupEntry, GroupLayout, GroupValues};
pub use models::{
    DeviceModel, MODEL_NUMBER_FIELD, RHP12RNA_MODEL_NUMBER, RHP12RN_MODEL_NUMBER,
};
pub use registry::FieldRegistry;

/// Result type for control table operations.
pub type Result<T> = std::result::Result<T, ControlTableError>;
