//! Concrete robot commands.
//!
//! - [`DriveCommand`] – joystick arcade drive; the drivetrain's default
//!   command and, fed pre-scaled sticks, slow mode.
//! - [`EffortCommand`] – runs one mechanism at a fixed effort and leaves a
//!   hold effort behind when it ends.  Every roller, arm and climber command
//!   is one of these.
//! - [`AutoDrive`] – open-loop drive at a fixed effort for autonomous
//!   routines.

use std::collections::BTreeSet;

use reefbot_kernel::{Command, InputConditioner, Outputs};
use reefbot_types::{ActuatorId, RobotError};

type AxisSource = Box<dyn Fn() -> f64>;

/// Arcade drive from two axis sources.
///
/// Each tick both axis samples are deadband-conditioned (and optionally
/// squared) and mixed into left and right efforts.  Any scaling belongs in
/// the axis sources, ahead of the deadband.
pub struct DriveCommand {
    name: String,
    forward: AxisSource,
    rotation: AxisSource,
    conditioner: InputConditioner,
    squared: bool,
}

impl DriveCommand {
    pub fn new(
        name: impl Into<String>,
        forward: impl Fn() -> f64 + 'static,
        rotation: impl Fn() -> f64 + 'static,
        conditioner: InputConditioner,
    ) -> Self {
        Self {
            name: name.into(),
            forward: Box::new(forward),
            rotation: Box::new(rotation),
            conditioner,
            squared: false,
        }
    }

    /// Square the conditioned inputs (keeping their sign) for finer control
    /// near center.
    pub fn squared(mut self, squared: bool) -> Self {
        self.squared = squared;
        self
    }

    /// The `(forward, rotation)` pair this command would send right now.
    pub fn demand(&self) -> (f64, f64) {
        let forward = self.conditioner.condition_with((self.forward)(), self.squared);
        let rotation = self.conditioner.condition_with((self.rotation)(), self.squared);
        (forward, rotation)
    }
}

impl Command for DriveCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> BTreeSet<ActuatorId> {
        BTreeSet::from([ActuatorId::Drivetrain])
    }

    fn execute(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
        let (forward, rotation) = self.demand();
        out.arcade_drive(forward, rotation)
    }

    fn end(&mut self, out: &mut Outputs<'_>, _interrupted: bool) -> Result<(), RobotError> {
        out.stop(ActuatorId::Drivetrain)
    }
}

/// Runs every channel of one mechanism at `run` while scheduled and sets
/// `hold` when it ends, interrupted or not.
pub struct EffortCommand {
    name: String,
    actuator: ActuatorId,
    run: f64,
    hold: f64,
}

impl EffortCommand {
    pub fn new(name: impl Into<String>, actuator: ActuatorId, run: f64) -> Self {
        Self {
            name: name.into(),
            actuator,
            run,
            hold: 0.0,
        }
    }

    /// Effort to leave on the mechanism after the command ends.
    pub fn holding(mut self, hold: f64) -> Self {
        self.hold = hold;
        self
    }

    fn set_all(&self, out: &mut Outputs<'_>, effort: f64) -> Result<(), RobotError> {
        for channel in self.actuator.channels() {
            out.set_effort(*channel, effort)?;
        }
        Ok(())
    }
}

impl Command for EffortCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> BTreeSet<ActuatorId> {
        BTreeSet::from([self.actuator])
    }

    fn execute(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
        self.set_all(out, self.run)
    }

    fn end(&mut self, out: &mut Outputs<'_>, _interrupted: bool) -> Result<(), RobotError> {
        self.set_all(out, self.hold)
    }
}

/// Drives at a fixed forward effort and stops when it ends.  Never finishes
/// by itself; wrap it in a timeout.
pub struct AutoDrive {
    forward: f64,
    rotation: f64,
}

impl AutoDrive {
    pub fn new(forward: f64, rotation: f64) -> Self {
        Self { forward, rotation }
    }
}

impl Command for AutoDrive {
    fn name(&self) -> &str {
        "AutoDrive"
    }

    fn requirements(&self) -> BTreeSet<ActuatorId> {
        BTreeSet::from([ActuatorId::Drivetrain])
    }

    fn execute(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
        out.arcade_drive(self.forward, self.rotation)
    }

    fn end(&mut self, out: &mut Outputs<'_>, _interrupted: bool) -> Result<(), RobotError> {
        out.stop(ActuatorId::Drivetrain)
    }
}
