//! The [`Command`] capability set and the restricted actuation handle commands
//! write through.
//!
//! A command never holds a motor.  Every lifecycle step receives an
//! [`Outputs`] built by the scheduler for that call, which forwards writes to
//! the [`ActuatorBank`] only for channels whose actuator the command declared
//! in [`Command::requirements`].  A write to any other channel fails with
//! [`RobotError::NotOwner`], which the scheduler treats like any other fault.

use std::collections::BTreeSet;
use std::fmt;

use reefbot_hal::{ActuatorBank, arcade_mix};
use reefbot_types::{ActuatorId, Channel, RobotError};

/// Stable identifier of a command registered with the
/// [`Scheduler`][crate::scheduler::Scheduler].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandHandle(usize);

impl CommandHandle {
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a registered command.
///
/// `Initializing` and `Ending` are only observable from inside the
/// corresponding lifecycle step; between ticks a command is either `Idle` or
/// `Executing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Idle,
    Initializing,
    Executing,
    Ending,
}

/// A schedulable unit of behavior.
///
/// Only [`execute`][Command::execute] and
/// [`requirements`][Command::requirements] are mandatory; the remaining steps
/// default to no-ops and `is_finished` defaults to "runs until interrupted".
pub trait Command {
    /// Human-readable name used in logs and telemetry.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Actuators this command needs exclusive access to.  Read once, when the
    /// command is registered.
    fn requirements(&self) -> BTreeSet<ActuatorId>;

    /// Runs once when the command is scheduled, before its first `execute`.
    fn initialize(&mut self, _out: &mut Outputs<'_>) -> Result<(), RobotError> {
        Ok(())
    }

    /// Runs once per tick while scheduled.  Must not block.
    fn execute(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError>;

    /// Runs once when the command stops.  `interrupted` is `false` only when
    /// the command ended because `is_finished` returned `true`.
    fn end(&mut self, _out: &mut Outputs<'_>, _interrupted: bool) -> Result<(), RobotError> {
        Ok(())
    }

    /// Checked after every `execute`.
    fn is_finished(&self) -> bool {
        false
    }
}

impl<C: Command + ?Sized> Command for Box<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn requirements(&self) -> BTreeSet<ActuatorId> {
        (**self).requirements()
    }

    fn initialize(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
        (**self).initialize(out)
    }

    fn execute(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
        (**self).execute(out)
    }

    fn end(&mut self, out: &mut Outputs<'_>, interrupted: bool) -> Result<(), RobotError> {
        (**self).end(out, interrupted)
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }
}

/// Write access to the actuators a command owns, valid for one lifecycle
/// step.
pub struct Outputs<'a> {
    bank: &'a mut ActuatorBank,
    owned: &'a BTreeSet<ActuatorId>,
    command: &'a str,
}

impl<'a> Outputs<'a> {
    /// Normally built by the scheduler; public so commands can be exercised
    /// directly in tests.
    pub fn new(
        bank: &'a mut ActuatorBank,
        owned: &'a BTreeSet<ActuatorId>,
        command: &'a str,
    ) -> Self {
        Self {
            bank,
            owned,
            command,
        }
    }

    /// Reborrow as a handle for a member of a group.  Writes stay limited to
    /// this handle's actuators even when `owned` is not a subset of them.
    pub fn scoped<'b>(&'b mut self, owned: &'b BTreeSet<ActuatorId>, command: &'b str) -> Outputs<'b> {
        let owned = if owned.is_subset(self.owned) { owned } else { self.owned };
        Outputs {
            bank: &mut *self.bank,
            owned,
            command,
        }
    }

    /// Name of the command this handle was issued to.
    pub fn command(&self) -> &str {
        self.command
    }

    pub fn owns(&self, actuator: ActuatorId) -> bool {
        self.owned.contains(&actuator)
    }

    /// Command `effort` on `channel`.
    ///
    /// # Errors
    ///
    /// [`RobotError::NotOwner`] when the channel's actuator is not among this
    /// command's requirements, otherwise whatever the bank returns.
    pub fn set_effort(&mut self, channel: Channel, effort: f64) -> Result<(), RobotError> {
        if !self.owns(channel.actuator()) {
            return Err(RobotError::NotOwner {
                command: self.command.to_string(),
                channel,
            });
        }
        self.bank.set_effort(channel, effort)
    }

    /// Last commanded effort on any channel.  Reads are not restricted.
    pub fn effort(&self, channel: Channel) -> Option<f64> {
        self.bank.effort(channel)
    }

    /// Drive the base with arcade mixing.
    pub fn arcade_drive(&mut self, forward: f64, rotation: f64) -> Result<(), RobotError> {
        let wheels = arcade_mix(forward, rotation);
        self.set_effort(Channel::DriveLeft, wheels.left)?;
        self.set_effort(Channel::DriveRight, wheels.right)
    }

    /// Zero every channel of `actuator`.
    pub fn stop(&mut self, actuator: ActuatorId) -> Result<(), RobotError> {
        for channel in actuator.channels() {
            self.set_effort(*channel, 0.0)?;
        }
        Ok(())
    }
}
