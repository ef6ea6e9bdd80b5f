//! Autonomous routines.
//!
//! Durations come from [`AutonomousConfig`][crate::config::AutonomousConfig]
//! in seconds and are converted to ticks of the control period when the
//! routine is built.

use std::time::Duration;

use reefbot_kernel::{CommandExt, Race, Sequence, ticks_for};
use reefbot_types::{ActuatorId, RobotError};

use crate::commands::{AutoDrive, EffortCommand};
use crate::config::RobotConfig;

/// Name of the default routine.
pub const CORAL_AUTO: &str = "Coral Auto";
pub const DRIVE_FORWARD_AUTO: &str = "Drive Forward Auto";

fn ticks(secs: f64, period: Duration) -> u32 {
    ticks_for(Duration::from_secs_f64(secs.max(0.0)), period)
}

/// Drive forward with the arm held down, then eject the coral.
///
/// # Errors
///
/// Propagates group construction errors.
pub fn coral_auto(config: &RobotConfig, period: Duration) -> Result<Sequence, RobotError> {
    let auto = &config.autonomous;
    let drive = AutoDrive::new(auto.drive_effort, 0.0)
        .with_timeout(ticks(auto.coral_drive_secs, period));
    let arm_down = EffortCommand::new("ArmHoldDown", ActuatorId::Arm, config.arm.hold_down)
        .holding(config.arm.hold_down);
    let approach = Race::new("CoralApproach", vec![drive.boxed(), arm_down.boxed()])?;

    let eject = EffortCommand::new("CoralEject", ActuatorId::Roller, config.roller.coral_out)
        .with_timeout(ticks(auto.coral_eject_secs, period));

    Ok(Sequence::new(CORAL_AUTO, vec![approach.boxed(), eject.boxed()]))
}

/// Drive straight forward for the configured time.
pub fn drive_forward_auto(config: &RobotConfig, period: Duration) -> Sequence {
    let auto = &config.autonomous;
    let drive = AutoDrive::new(auto.drive_effort, 0.0)
        .with_timeout(ticks(auto.drive_forward_secs, period));
    Sequence::new(DRIVE_FORWARD_AUTO, vec![drive.boxed()])
}
