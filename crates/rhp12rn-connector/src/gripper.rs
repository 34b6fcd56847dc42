//! Named accessors over a [`Connection`].
//!
//! Every accessor is a single `read_field`/`write_field` (or a short
//! pipelined batch) on one of the built-in field names. Fields that the
//! attached model lacks fail with [`ConnectorError::UnknownField`].

use crate::{Connection, ConnectorError, Result};
use rhp12rn_control_table::GroupValues;
use rhp12rn_transport::Bus;

/// `operating_mode` value for current control.
pub const OPERATING_MODE_CURRENT: i64 = 0;

/// `operating_mode` value for current-based position control.
pub const OPERATING_MODE_POSITION: i64 = 5;

/// Map `value` in `[min, max]` to `[0, 1]`.
pub fn to_relative(value: i64, min: i64, max: i64) -> f64 {
    (value - min) as f64 / (max - min) as f64
}

/// Map `value` in `[0, 1]` to `[min, max]`, rounded to the nearest step.
pub fn from_relative(value: f64, min: i64, max: i64) -> i64 {
    (value * (max - min) as f64 + min as f64).round() as i64
}

/// Decoded bulk status of an RH-P12-RN(A).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GripperStatus {
    /// Device clock in milliseconds, wrapping at 32767.
    pub realtime_tick: i64,
    /// Whether a movement is in progress.
    pub moving: bool,
    /// Detailed movement flags.
    pub moving_status: i64,
    /// Present PWM output.
    pub present_pwm: i64,
    /// Present motor current.
    pub present_current: i64,
    /// Present velocity.
    pub present_velocity: i64,
    /// Present position.
    pub present_position: i64,
}

impl TryFrom<&GroupValues> for GripperStatus {
    type Error = ConnectorError;

    fn try_from(values: &GroupValues) -> Result<Self> {
        let get = |name: &str| {
            values
                .get(name)
                .copied()
                .ok_or_else(|| ConnectorError::UnknownField(name.to_string()))
        };
        Ok(GripperStatus {
            realtime_tick: get("realtime_tick")?,
            moving: get("moving")? != 0,
            moving_status: get("moving_status")?,
            present_pwm: get("present_pwm")?,
            present_current: get("present_current")?,
            present_velocity: get("present_velocity")?,
            present_position: get("present_position")?,
        })
    }
}

/// Plain accessors for a gripper.
pub struct Gripper<'c, B: Bus> {
    conn: &'c mut Connection<B>,
}

impl<'c, B: Bus> Gripper<'c, B> {
    /// Wrap a connection.
    pub fn new(conn: &'c mut Connection<B>) -> Self {
        Gripper { conn }
    }

    /// The wrapped connection.
    pub fn connection(&mut self) -> &mut Connection<B> {
        self.conn
    }

    /// Read several fields in one pipelined batch.
    ///
    /// Every response is drained even if an earlier one failed; the first
    /// error is returned.
    fn read_batch<const N: usize>(&mut self, names: [&str; N]) -> Result<[i64; N]> {
        let mut handles = Vec::with_capacity(N);
        for name in names {
            match self.conn.read_field_async(name) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    for handle in handles {
                        let _ = self.conn.abandon(handle);
                    }
                    return Err(err);
                }
            }
        }
        let mut values = [0; N];
        let mut first_err = None;
        for (value, handle) in values.iter_mut().zip(handles) {
            match self.conn.result(handle) {
                Ok(v) => *value = v,
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(values),
        }
    }

    // Torque

    /// Whether torque is on.
    pub fn torque_enabled(&mut self) -> Result<bool> {
        Ok(self.conn.read_field("torque_enable")? != 0)
    }

    /// Switch torque on or off.
    pub fn set_torque_enabled(&mut self, enabled: bool) -> Result<()> {
        self.conn.write_field("torque_enable", i64::from(enabled))
    }

    // Limits

    /// `(min_position_limit, max_position_limit)`.
    pub fn position_limits(&mut self) -> Result<(i64, i64)> {
        let [min, max] = self.read_batch(["min_position_limit", "max_position_limit"])?;
        Ok((min, max))
    }

    /// Lower position limit.
    pub fn position_limit_low(&mut self) -> Result<i64> {
        self.conn.read_field("min_position_limit")
    }

    /// Set the lower position limit. Requires torque off.
    pub fn set_position_limit_low(&mut self, value: i64) -> Result<()> {
        self.conn.write_field("min_position_limit", value)
    }

    /// Upper position limit.
    pub fn position_limit_high(&mut self) -> Result<i64> {
        self.conn.read_field("max_position_limit")
    }

    /// Set the upper position limit. Requires torque off.
    pub fn set_position_limit_high(&mut self, value: i64) -> Result<()> {
        self.conn.write_field("max_position_limit", value)
    }

    /// Velocity limit.
    pub fn velocity_limit(&mut self) -> Result<i64> {
        self.conn.read_field("velocity_limit")
    }

    /// Set the velocity limit. Requires torque off.
    pub fn set_velocity_limit(&mut self, value: i64) -> Result<()> {
        self.conn.write_field("velocity_limit", value)
    }

    /// Acceleration limit.
    pub fn acceleration_limit(&mut self) -> Result<i64> {
        self.conn.read_field("acceleration_limit")
    }

    /// Set the acceleration limit. Requires torque off.
    pub fn set_acceleration_limit(&mut self, value: i64) -> Result<()> {
        self.conn.write_field("acceleration_limit", value)
    }

    // Goals

    /// Goal position in device units.
    pub fn goal_position(&mut self) -> Result<i64> {
        self.conn.read_field("goal_position")
    }

    /// Set the goal position in device units.
    pub fn set_goal_position(&mut self, value: i64) -> Result<()> {
        self.conn.write_field("goal_position", value)
    }

    /// Goal position relative to the position limits.
    pub fn goal_position_rel(&mut self) -> Result<f64> {
        let [goal, min, max] =
            self.read_batch(["goal_position", "min_position_limit", "max_position_limit"])?;
        Ok(to_relative(goal, min, max))
    }

    /// Set the goal position relative to the position limits. Values outside
    /// `[0, 1]` are passed through; the device enforces its limits.
    pub fn set_goal_position_rel(&mut self, value: f64) -> Result<()> {
        let (min, max) = self.position_limits()?;
        self.set_goal_position(from_relative(value, min, max))
    }

    /// Goal velocity in device units.
    pub fn goal_velocity(&mut self) -> Result<i64> {
        self.conn.read_field("goal_velocity")
    }

    /// Set the goal velocity in device units.
    pub fn set_goal_velocity(&mut self, value: i64) -> Result<()> {
        self.conn.write_field("goal_velocity", value)
    }

    /// Goal velocity relative to `[-velocity_limit, velocity_limit]`.
    pub fn goal_velocity_rel(&mut self) -> Result<f64> {
        let [goal, limit] = self.read_batch(["goal_velocity", "velocity_limit"])?;
        Ok(to_relative(goal, -limit, limit))
    }

    /// Set the goal velocity as a fraction of the velocity limit.
    pub fn set_goal_velocity_rel(&mut self, value: f64) -> Result<()> {
        let limit = self.velocity_limit()?;
        self.set_goal_velocity(from_relative(value, -limit, limit))
    }

    /// Goal current in device units.
    pub fn goal_current(&mut self) -> Result<i64> {
        self.conn.read_field("goal_current")
    }

    /// Set the goal current in device units.
    pub fn set_goal_current(&mut self, value: i64) -> Result<()> {
        self.conn.write_field("goal_current", value)
    }

    /// Goal acceleration (RH-P12-RN only).
    pub fn goal_acceleration(&mut self) -> Result<i64> {
        self.conn.read_field("goal_acceleration")
    }

    /// Set the goal acceleration.
    pub fn set_goal_acceleration(&mut self, value: i64) -> Result<()> {
        self.conn.write_field("goal_acceleration", value)
    }

    // Present state

    /// Present position in device units.
    pub fn present_position(&mut self) -> Result<i64> {
        self.conn.read_field("present_position")
    }

    /// Present position relative to the position limits.
    pub fn present_position_rel(&mut self) -> Result<f64> {
        let [present, min, max] =
            self.read_batch(["present_position", "min_position_limit", "max_position_limit"])?;
        Ok(to_relative(present, min, max))
    }

    /// Present velocity in device units.
    pub fn present_velocity(&mut self) -> Result<i64> {
        self.conn.read_field("present_velocity")
    }

    /// Present current in device units.
    pub fn present_current(&mut self) -> Result<i64> {
        self.conn.read_field("present_current")
    }

    /// Device clock in milliseconds.
    pub fn realtime_tick(&mut self) -> Result<i64> {
        self.conn.read_field("realtime_tick")
    }

    /// Baud rate register value (an index, not bits per second).
    pub fn baud_rate(&mut self) -> Result<i64> {
        self.conn.read_field("baud_rate")
    }

    /// Bulk status in one transaction (RH-P12-RN(A) only).
    pub fn status(&mut self) -> Result<GripperStatus> {
        let values = self.conn.group_read()?;
        GripperStatus::try_from(&values)
    }

    // Gains

    /// Position loop P gain.
    pub fn position_p_gain(&mut self) -> Result<i64> {
        self.conn.read_field("position_p_gain")
    }

    /// Set the position loop P gain.
    pub fn set_position_p_gain(&mut self, value: i64) -> Result<()> {
        self.conn.write_field("position_p_gain", value)
    }

    /// Position loop I gain.
    pub fn position_i_gain(&mut self) -> Result<i64> {
        self.conn.read_field("position_i_gain")
    }

    /// Set the position loop I gain.
    pub fn set_position_i_gain(&mut self, value: i64) -> Result<()> {
        self.conn.write_field("position_i_gain", value)
    }

    /// Position loop D gain.
    pub fn position_d_gain(&mut self) -> Result<i64> {
        self.conn.read_field("position_d_gain")
    }

    /// Set the position loop D gain.
    pub fn set_position_d_gain(&mut self, value: i64) -> Result<()> {
        self.conn.write_field("position_d_gain", value)
    }

    // Operating mode

    /// Raw operating mode.
    pub fn operating_mode(&mut self) -> Result<i64> {
        self.conn.read_field("operating_mode")
    }

    /// Switch to current-based position control. Torque must be disabled.
    pub fn enable_position_control(&mut self) -> Result<()> {
        self.conn.write_field("operating_mode", OPERATING_MODE_POSITION)
    }

    /// Switch to current control. Torque must be disabled.
    pub fn enable_current_control(&mut self) -> Result<()> {
        self.conn.write_field("operating_mode", OPERATING_MODE_CURRENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_conversions() {
        assert_eq!(to_relative(0, 0, 1150), 0.0);
        assert_eq!(to_relative(1150, 0, 1150), 1.0);
        assert_eq!(to_relative(0, -100, 100), 0.5);
        assert_eq!(from_relative(0.5, 0, 660), 330);
        assert_eq!(from_relative(1.0, 0, 1150), 1150);
        assert_eq!(from_relative(0.25, -100, 100), -50);
    }

    #[test]
    fn test_status_from_values() {
        let mut values = GroupValues::new();
        for (name, value) in [
            ("realtime_tick", 17),
            ("moving", 1),
            ("moving_status", 3),
            ("present_pwm", -4),
            ("present_current", -32768),
            ("present_velocity", 0),
            ("present_position", 600),
        ] {
            values.insert(name.to_string(), value);
        }
        let status = GripperStatus::try_from(&values).expect("complete");
        assert!(status.moving);
        assert_eq!(status.present_current, -32768);

        values.remove("present_position");
        assert!(GripperStatus::try_from(&values).is_err());
    }
}
