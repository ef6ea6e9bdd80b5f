//! Robot constants as a serde-loadable configuration.
//!
//! Every field has a default matching the competition robot, so an empty
//! (or missing) config file yields a working robot.  Loading from disk and
//! environment overrides live in the CLI; this module only defines the shape
//! and [`RobotConfig::validate`].

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use reefbot_types::{Channel, MotorConfig, RobotError};
use serde::{Deserialize, Serialize};

use crate::autos::{CORAL_AUTO, DRIVE_FORWARD_AUTO};

/// Complete robot configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub drive: DriveConfig,
    pub roller: RollerConfig,
    pub arm: ArmConfig,
    pub climber: ClimberConfig,
    pub driver: DriverConfig,
    pub control: ControlConfig,
    pub autonomous: AutonomousConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub left_leader_id: u8,
    pub left_follower_id: u8,
    pub right_leader_id: u8,
    pub right_follower_id: u8,
    pub current_limit_amps: u32,
    pub voltage_comp_volts: f64,
    /// Forward stick scale applied before conditioning while slow mode is held.
    pub slow_move: f64,
    /// Rotation stick scale applied before conditioning while slow mode is held.
    pub slow_turn: f64,
    pub squared_inputs: bool,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            left_leader_id: 1,
            left_follower_id: 2,
            right_leader_id: 3,
            right_follower_id: 4,
            current_limit_amps: 60,
            voltage_comp_volts: 12.0,
            slow_move: 0.2,
            slow_turn: 0.2,
            squared_inputs: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollerConfig {
    pub can_id: u8,
    pub current_limit_amps: u32,
    pub voltage_comp_volts: f64,
    pub coral_out: f64,
    pub algae_in: f64,
    pub algae_out: f64,
    pub coral_stack: f64,
    /// Right trigger travel past which algae out runs.
    pub algae_out_threshold: f64,
}

impl Default for RollerConfig {
    fn default() -> Self {
        Self {
            can_id: 5,
            current_limit_amps: 60,
            voltage_comp_volts: 10.0,
            coral_out: -0.4,
            algae_in: -0.8,
            algae_out: 0.4,
            coral_stack: -1.0,
            algae_out_threshold: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    pub can_id: u8,
    pub current_limit_amps: u32,
    pub voltage_comp_volts: f64,
    pub speed_up: f64,
    pub speed_down: f64,
    /// Effort left on the arm after moving up.
    pub hold_up: f64,
    /// Effort left on the arm after moving down.
    pub hold_down: f64,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            can_id: 6,
            current_limit_amps: 60,
            voltage_comp_volts: 10.0,
            speed_up: 0.1,
            speed_down: -0.1,
            hold_up: 0.05,
            hold_down: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimberConfig {
    pub can_id: u8,
    pub current_limit_amps: u32,
    pub voltage_comp_volts: f64,
    pub speed_up: f64,
    pub speed_down: f64,
}

impl Default for ClimberConfig {
    fn default() -> Self {
        Self {
            can_id: 7,
            current_limit_amps: 60,
            voltage_comp_volts: 12.0,
            speed_up: 1.0,
            speed_down: -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub port: u8,
    pub deadband: f64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            port: 0,
            deadband: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub period_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self { period_ms: 20 }
    }
}

impl ControlConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutonomousConfig {
    /// Routine selected at startup.
    pub default_mode: String,
    /// Forward effort while an autonomous routine drives.
    pub drive_effort: f64,
    /// How long "Coral Auto" drives before ejecting.
    pub coral_drive_secs: f64,
    /// How long "Coral Auto" runs the roller to eject.
    pub coral_eject_secs: f64,
    /// How long "Drive Forward Auto" drives.
    pub drive_forward_secs: f64,
}

impl Default for AutonomousConfig {
    fn default() -> Self {
        Self {
            default_mode: CORAL_AUTO.to_string(),
            drive_effort: 0.5,
            coral_drive_secs: 3.25,
            coral_eject_secs: 1.0,
            drive_forward_secs: 2.0,
        }
    }
}

impl RobotConfig {
    /// Per-channel motor settings, applied once at startup.
    pub fn motor_table(&self) -> BTreeMap<Channel, MotorConfig> {
        let d = &self.drive;
        BTreeMap::from([
            (
                Channel::DriveLeft,
                MotorConfig {
                    can_id: d.left_leader_id,
                    follower_can_id: Some(d.left_follower_id),
                    current_limit_amps: d.current_limit_amps,
                    voltage_comp_volts: d.voltage_comp_volts,
                },
            ),
            (
                Channel::DriveRight,
                MotorConfig {
                    can_id: d.right_leader_id,
                    follower_can_id: Some(d.right_follower_id),
                    current_limit_amps: d.current_limit_amps,
                    voltage_comp_volts: d.voltage_comp_volts,
                },
            ),
            (
                Channel::Roller,
                single(self.roller.can_id, self.roller.current_limit_amps, self.roller.voltage_comp_volts),
            ),
            (
                Channel::Arm,
                single(self.arm.can_id, self.arm.current_limit_amps, self.arm.voltage_comp_volts),
            ),
            (
                Channel::Climber,
                single(
                    self.climber.can_id,
                    self.climber.current_limit_amps,
                    self.climber.voltage_comp_volts,
                ),
            ),
        ])
    }

    /// Reject values the robot cannot run with.
    ///
    /// # Errors
    ///
    /// [`RobotError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), RobotError> {
        if !(self.driver.deadband.is_finite() && (0.0..1.0).contains(&self.driver.deadband)) {
            return Err(invalid("driver.deadband", "must be within [0, 1)"));
        }
        for (field, scale) in [("drive.slow_move", self.drive.slow_move), ("drive.slow_turn", self.drive.slow_turn)] {
            if !(scale.is_finite() && scale > 0.0 && scale <= 1.0) {
                return Err(invalid(field, "must be within (0, 1]"));
            }
        }
        let efforts = [
            ("roller.coral_out", self.roller.coral_out),
            ("roller.algae_in", self.roller.algae_in),
            ("roller.algae_out", self.roller.algae_out),
            ("roller.coral_stack", self.roller.coral_stack),
            ("arm.speed_up", self.arm.speed_up),
            ("arm.speed_down", self.arm.speed_down),
            ("arm.hold_up", self.arm.hold_up),
            ("arm.hold_down", self.arm.hold_down),
            ("climber.speed_up", self.climber.speed_up),
            ("climber.speed_down", self.climber.speed_down),
            ("autonomous.drive_effort", self.autonomous.drive_effort),
        ];
        for (field, effort) in efforts {
            if !(effort.is_finite() && effort.abs() <= 1.0) {
                return Err(invalid(field, "effort must be within [-1, 1]"));
            }
        }
        let threshold = self.roller.algae_out_threshold;
        if !(threshold.is_finite() && (-1.0..1.0).contains(&threshold)) {
            return Err(invalid("roller.algae_out_threshold", "must be within [-1, 1)"));
        }
        if self.control.period_ms == 0 {
            return Err(invalid("control.period_ms", "must be positive"));
        }
        let durations = [
            ("autonomous.coral_drive_secs", self.autonomous.coral_drive_secs),
            ("autonomous.coral_eject_secs", self.autonomous.coral_eject_secs),
            ("autonomous.drive_forward_secs", self.autonomous.drive_forward_secs),
        ];
        for (field, secs) in durations {
            if !(secs.is_finite() && secs >= 0.0) {
                return Err(invalid(field, "must be a non-negative number of seconds"));
            }
        }
        if ![CORAL_AUTO, DRIVE_FORWARD_AUTO].contains(&self.autonomous.default_mode.as_str()) {
            return Err(invalid(
                "autonomous.default_mode",
                &format!("unknown routine '{}'", self.autonomous.default_mode),
            ));
        }

        let mut ids = BTreeSet::new();
        for motor in self.motor_table().values() {
            for id in std::iter::once(motor.can_id).chain(motor.follower_can_id) {
                if !ids.insert(id) {
                    return Err(invalid("can ids", &format!("CAN id {id} is used twice")));
                }
            }
        }
        Ok(())
    }
}

fn single(can_id: u8, current_limit_amps: u32, voltage_comp_volts: f64) -> MotorConfig {
    MotorConfig {
        can_id,
        follower_can_id: None,
        current_limit_amps,
        voltage_comp_volts,
    }
}

fn invalid(field: &str, reason: &str) -> RobotError {
    RobotError::Config(format!("{field}: {reason}"))
}
