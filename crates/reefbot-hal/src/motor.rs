//! Generic `Motor` trait for effort-controlled outputs.
//!
//! Drivers implement this trait and register themselves with an
//! [`ActuatorBank`][crate::bank::ActuatorBank].  The scheduler and commands
//! only ever talk to the bank, so a driver can be swapped for a simulated one
//! without touching any control logic.

use reefbot_types::{Channel, MotorConfig, RobotError};

/// An open-loop motor output driven by a normalized effort in [-1, 1].
pub trait Motor: Send {
    /// The channel this motor drives.
    fn channel(&self) -> Channel;

    /// Command a new effort.  The bank has already validated and clamped the
    /// value to [-1, 1].
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::HardwareFault`] if the controller rejects the
    /// command (bus error, brownout, controller in fault state).
    fn set_effort(&mut self, effort: f64) -> Result<(), RobotError>;

    /// The most recently commanded effort.
    fn effort(&self) -> f64;

    /// Apply current limiting and voltage compensation.  Called once at
    /// startup, never from the scheduling loop.
    fn configure(&mut self, config: &MotorConfig) -> Result<(), RobotError>;
}
