//! Built-in register maps for the supported grippers.
//!
//! Addresses follow the ROBOTIS e-Manual control tables. Only the fields
//! needed by the connector and the accessor layer are listed; the tables are
//! data, not protocol logic, so extending them does not touch the engine.

use crate::{DataType, Field, FieldRegistry, GroupLayout};
use crate::DataType::{S16, S32, U16, U32, U8};
use serde::{Deserialize, Serialize};

/// Model number reported by the RH-P12-RN.
pub const RHP12RN_MODEL_NUMBER: u16 = 35073;

/// Model number reported by the RH-P12-RN(A).
pub const RHP12RNA_MODEL_NUMBER: u16 = 35074;

/// Name of the model number field (address 0 on every Dynamixel device).
pub const MODEL_NUMBER_FIELD: &str = "model_number";

/// (address, type, name, description, writable, initial value)
type FieldRow = (u16, DataType, &'static str, &'static str, bool, Option<i64>);

// ============================================================================
// RH-P12-RN
// ============================================================================

const RHP12RN_EEPROM: &[FieldRow] = &[
    (0, U16, "model_number", "Model Number", false, Some(35073)),
    (2, U32, "model_information", "Model Information", false, None),
    (6, U8, "firmware_version", "Firmware Version", false, None),
    (7, U8, "id", "Dynamixel ID", true, Some(1)),
    (8, U8, "baud_rate", "Communication Speed", true, Some(1)),
    (9, U8, "return_delay_time", "Response Delay Time", true, Some(250)),
    (11, U8, "operating_mode", "Operating Mode", true, Some(5)),
    (13, S32, "homing_offset", "Home Position Offset", true, Some(0)),
    (17, U32, "moving_threshold", "Velocity Threshold for Movement Detection", true, Some(10)),
    (21, U8, "temperature_limit", "Maximum Internal Temperature Limit", true, Some(80)),
    (22, U16, "max_voltage_limit", "Maximum Input Voltage Limit", true, Some(300)),
    (24, U16, "min_voltage_limit", "Minimum Input Voltage Limit", true, Some(150)),
    (26, U32, "acceleration_limit", "Maximum Acceleration Limit", true, Some(255)),
    (30, U16, "current_limit", "Maximum Current Limit", true, Some(820)),
    (32, U32, "velocity_limit", "Maximum Velocity Limit", true, Some(100)),
    (36, S32, "max_position_limit", "Maximum Position Limit", true, Some(1150)),
    (40, S32, "min_position_limit", "Minimum Position Limit", true, Some(0)),
    (48, U8, "shutdown", "Shutdown Error Information", true, Some(58)),
];

const RHP12RN_RAM: &[FieldRow] = &[
    (562, U8, "torque_enable", "Motor Torque On/Off", true, Some(0)),
    (563, U8, "led_red", "Red LED Intensity Value", true, Some(0)),
    (564, U8, "led_green", "Green LED Intensity Value", true, Some(0)),
    (565, U8, "led_blue", "Blue LED Intensity Value", true, Some(0)),
    (586, U16, "velocity_i_gain", "I Gain of Velocity", true, None),
    (588, U16, "velocity_p_gain", "P Gain of Velocity", true, None),
    (594, U16, "position_p_gain", "P Gain of Position", true, None),
    (596, S32, "goal_position", "Desired Position", true, None),
    (600, S32, "goal_velocity", "Desired Velocity", true, Some(0)),
    (604, S16, "goal_current", "Desired Current", true, Some(0)),
    (606, S32, "goal_acceleration", "Desired Acceleration", true, Some(0)),
    (610, U8, "moving", "Movement Status", false, Some(0)),
    (611, S32, "present_position", "Present Position", false, None),
    (615, S32, "present_velocity", "Present Velocity", false, None),
    (621, S16, "present_current", "Present Current", false, None),
    (623, U16, "present_input_voltage", "Present Input Voltage", false, None),
    (625, U8, "present_temperature", "Present Internal Temperature", false, None),
    (890, U8, "registered_instruction", "REG_WRITE Instruction Flag", false, Some(0)),
    (891, U8, "status_return_level", "Select Types of Status Return", true, Some(2)),
    (892, U8, "hardware_error_status", "Hardware Error Status", false, Some(0)),
];

// ============================================================================
// RH-P12-RN(A)
// ============================================================================

const RHP12RNA_EEPROM: &[FieldRow] = &[
    (0, U16, "model_number", "Model Number", false, Some(35074)),
    (2, U32, "model_information", "Model Information", false, None),
    (6, U8, "firmware_version", "Firmware Version", false, None),
    (7, U8, "id", "Dynamixel ID", true, Some(1)),
    (8, U8, "baud_rate", "Communication Speed", true, Some(1)),
    (9, U8, "return_delay_time", "Response Delay Time", true, Some(250)),
    (11, U8, "operating_mode", "Operating Mode", true, Some(5)),
    (12, U8, "secondary_id", "Secondary ID", true, Some(255)),
    (20, S32, "homing_offset", "Home Position Offset", true, Some(0)),
    (24, U32, "moving_threshold", "Velocity Threshold for Movement Detection", true, Some(10)),
    (31, U8, "temperature_limit", "Maximum Internal Temperature Limit", true, Some(80)),
    (32, U16, "max_voltage_limit", "Maximum Input Voltage Limit", true, Some(160)),
    (34, U16, "min_voltage_limit", "Minimum Input Voltage Limit", true, Some(95)),
    (36, U16, "pwm_limit", "Maximum PWM Limit", true, Some(2009)),
    (38, U16, "current_limit", "Maximum Current Limit", true, Some(1984)),
    (40, U32, "acceleration_limit", "Maximum Acceleration Limit", true, Some(3447)),
    (44, U32, "velocity_limit", "Maximum Velocity Limit", true, Some(2970)),
    (48, S32, "max_position_limit", "Maximum Position Limit", true, Some(1150)),
    (52, S32, "min_position_limit", "Minimum Position Limit", true, Some(0)),
    (60, U8, "shutdown", "Shutdown Error Information", true, Some(58)),
];

const RHP12RNA_RAM: &[FieldRow] = &[
    (512, U8, "torque_enable", "Motor Torque On/Off", true, Some(0)),
    (513, U8, "led_red", "Red LED Intensity Value", true, Some(0)),
    (516, U8, "status_return_level", "Select Types of Status Return", true, Some(2)),
    (517, U8, "registered_instruction", "REG_WRITE Instruction Flag", false, Some(0)),
    (518, U8, "hardware_error_status", "Hardware Error Status", false, Some(0)),
    (524, U16, "velocity_i_gain", "I Gain of Velocity", true, None),
    (526, U16, "velocity_p_gain", "P Gain of Velocity", true, None),
    (528, U16, "position_d_gain", "D Gain of Position", true, Some(0)),
    (530, U16, "position_i_gain", "I Gain of Position", true, Some(0)),
    (532, U16, "position_p_gain", "P Gain of Position", true, None),
    (536, U16, "feedforward_2nd_gain", "Feedforward 2nd Gain", true, Some(0)),
    (538, U16, "feedforward_1st_gain", "Feedforward 1st Gain", true, Some(0)),
    (546, U8, "bus_watchdog", "Dynamixel Bus Watchdog", true, Some(0)),
    (548, S16, "goal_pwm", "Desired PWM Value", true, None),
    (550, S16, "goal_current", "Desired Current Value", true, None),
    (552, S32, "goal_velocity", "Desired Velocity Value", true, None),
    (556, U32, "profile_acceleration", "Acceleration Value of Profile", true, Some(0)),
    (560, U32, "profile_velocity", "Velocity Value of Profile", true, Some(0)),
    (564, S32, "goal_position", "Desired Position", true, None),
    (568, U16, "realtime_tick", "Count Time in Millisecond", false, None),
    (570, U8, "moving", "Movement Status", false, Some(0)),
    (571, U8, "moving_status", "Detailed Information of Movement Status", false, Some(0)),
    (572, S16, "present_pwm", "Present PWM Value", false, None),
    (574, S16, "present_current", "Present Current Value", false, None),
    (576, S32, "present_velocity", "Present Velocity Value", false, None),
    (580, S32, "present_position", "Present Position Value", false, None),
    (584, S32, "velocity_trajectory", "Desired Velocity Trajectory", false, None),
    (588, S32, "position_trajectory", "Desired Position Trajectory", false, None),
    (592, U16, "present_input_voltage", "Present Input Voltage", false, None),
    (594, U8, "present_temperature", "Present Internal Temperature", false, None),
];

fn build(table: &[FieldRow]) -> impl Iterator<Item = Field> + '_ {
    table
        .iter()
        .map(|&(address, data_type, name, description, writable, initial_value)| Field {
            address,
            data_type,
            name: name.to_string(),
            description: description.to_string(),
            writable,
            initial_value,
        })
}

// ============================================================================
// Device Model
// ============================================================================

/// Gripper models with a built-in register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceModel {
    /// RH-P12-RN (model number 35073).
    RhP12Rn,
    /// RH-P12-RN(A) (model number 35074).
    RhP12RnA,
}

impl DeviceModel {
    /// All built-in models.
    pub const ALL: [DeviceModel; 2] = [DeviceModel::RhP12Rn, DeviceModel::RhP12RnA];

    /// Model number stored at address 0.
    pub const fn model_number(self) -> u16 {
        match self {
            DeviceModel::RhP12Rn => RHP12RN_MODEL_NUMBER,
            DeviceModel::RhP12RnA => RHP12RNA_MODEL_NUMBER,
        }
    }

    /// Resolve a model number read from a device.
    pub fn from_model_number(model_number: u16) -> Option<Self> {
        DeviceModel::ALL
            .into_iter()
            .find(|model| model.model_number() == model_number)
    }

    /// Product name.
    pub const fn name(self) -> &'static str {
        match self {
            DeviceModel::RhP12Rn => "RH-P12-RN",
            DeviceModel::RhP12RnA => "RH-P12-RN(A)",
        }
    }

    /// Non-volatile fields (writable only with torque disabled).
    pub fn eeprom_fields(self) -> Vec<Field> {
        match self {
            DeviceModel::RhP12Rn => build(RHP12RN_EEPROM).collect(),
            DeviceModel::RhP12RnA => build(RHP12RNA_EEPROM).collect(),
        }
    }

    /// Volatile fields.
    pub fn ram_fields(self) -> Vec<Field> {
        match self {
            DeviceModel::RhP12Rn => build(RHP12RN_RAM).collect(),
            DeviceModel::RhP12RnA => build(RHP12RNA_RAM).collect(),
        }
    }

    /// EEPROM followed by RAM fields.
    pub fn fields(self) -> Vec<Field> {
        let mut fields = self.eeprom_fields();
        fields.extend(self.ram_fields());
        fields
    }

    /// Registry over [`fields`](Self::fields).
    pub fn registry(self) -> FieldRegistry {
        FieldRegistry::new(self.fields())
    }

    /// Bulk status layout, if this model has one.
    ///
    /// Only the RH-P12-RN(A) has a contiguous status block; the RH-P12-RN
    /// spreads tick, current and position over non-adjacent addresses.
    pub fn group_layout(self) -> Option<GroupLayout> {
        match self {
            DeviceModel::RhP12Rn => None,
            DeviceModel::RhP12RnA => Some(
                GroupLayout::new(RHP12RNA_MODEL_NUMBER, 568, 16)
                    .with_entry("realtime_tick", 0, U16)
                    .with_entry("moving", 2, U8)
                    .with_entry("moving_status", 3, U8)
                    .with_entry("present_pwm", 4, S16)
                    .with_entry("present_current", 6, S16)
                    .with_entry("present_velocity", 8, S32)
                    .with_entry("present_position", 12, S32),
            ),
        }
    }
}

impl std::fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldRegistry;

    #[test]
    fn test_tables_have_unique_names() {
        for model in DeviceModel::ALL {
            assert!(
                FieldRegistry::try_new(model.fields()).is_ok(),
                "{model} table has duplicate names"
            );
        }
    }

    #[test]
    fn test_model_number_field() {
        for model in DeviceModel::ALL {
            let registry = model.registry();
            let field = registry.lookup(MODEL_NUMBER_FIELD).expect("present");
            assert_eq!(field.address, 0);
            assert_eq!(field.data_type, DataType::U16);
            assert!(!field.writable);
            assert_eq!(field.initial_value, Some(i64::from(model.model_number())));
        }
    }

    #[test]
    fn test_from_model_number() {
        assert_eq!(DeviceModel::from_model_number(35073), Some(DeviceModel::RhP12Rn));
        assert_eq!(DeviceModel::from_model_number(35074), Some(DeviceModel::RhP12RnA));
        assert_eq!(DeviceModel::from_model_number(1020), None);
    }

    #[test]
    fn test_group_layout_matches_table() {
        let model = DeviceModel::RhP12RnA;
        let layout = model.group_layout().expect("RN(A) has a layout");
        layout.validate().expect("entries fit");

        let registry = model.registry();
        for entry in &layout.entries {
            let field = registry.lookup(&entry.name).expect("entry is a field");
            assert_eq!(field.address, layout.base_address + entry.offset, "{}", entry.name);
            assert_eq!(field.data_type, entry.data_type, "{}", entry.name);
        }
        assert!(DeviceModel::RhP12Rn.group_layout().is_none());
    }

    #[test]
    fn test_initial_values_fit_types() {
        for model in DeviceModel::ALL {
            for field in model.fields() {
                if let Some(value) = field.initial_value {
                    assert!(field.encode(value).is_ok(), "{}", field.name);
                }
            }
        }
    }
}
