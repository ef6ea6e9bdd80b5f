//! In-process simulated motors for tests and the simulated match.
//!
//! [`SimBank`] builds an [`ActuatorBank`] whose channels are backed by stub
//! drivers that record the commanded effort without touching hardware.
//! [`FaultyMotor`] behaves like a [`SimMotor`] until its [`FaultSwitch`] is
//! tripped, after which every command fails; tests use it to exercise the
//! scheduler's fault isolation.
//!
//! # Example
//!
//! ```rust
//! use reefbot_hal::sim::SimBank;
//! use reefbot_types::Channel;
//!
//! let mut bank = SimBank::new().with_drivetrain().with_roller().build();
//! bank.set_effort(Channel::Roller, -0.4).expect("sim roller must accept effort");
//! assert_eq!(bank.effort(Channel::Roller), Some(-0.4));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reefbot_types::{Channel, MotorConfig, RobotError};

use crate::bank::ActuatorBank;
use crate::motor::Motor;

// ────────────────────────────────────────────────────────────────────────────
// Stub motor
// ────────────────────────────────────────────────────────────────────────────

/// A simulated motor that records the most recent effort.  Always succeeds.
pub struct SimMotor {
    channel: Channel,
    effort: f64,
    config: Option<MotorConfig>,
}

impl SimMotor {
    /// Create a new simulated motor on `channel`.
    pub fn new(channel: Channel) -> Box<Self> {
        Box::new(Self {
            channel,
            effort: 0.0,
            config: None,
        })
    }
}

impl Motor for SimMotor {
    fn channel(&self) -> Channel {
        self.channel
    }

    fn set_effort(&mut self, effort: f64) -> Result<(), RobotError> {
        self.effort = effort;
        Ok(())
    }

    fn effort(&self) -> f64 {
        self.effort
    }

    fn configure(&mut self, config: &MotorConfig) -> Result<(), RobotError> {
        self.config = Some(config.clone());
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fault injection
// ────────────────────────────────────────────────────────────────────────────

/// Shared flag that makes every [`FaultyMotor`] holding it fail.
#[derive(Clone, Default)]
pub struct FaultSwitch(Arc<AtomicBool>);

impl FaultSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trip(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_tripped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A simulated motor that rejects commands while its switch is tripped.
pub struct FaultyMotor {
    inner: SimMotor,
    switch: FaultSwitch,
}

impl FaultyMotor {
    pub fn new(channel: Channel, switch: FaultSwitch) -> Box<Self> {
        Box::new(Self {
            inner: SimMotor {
                channel,
                effort: 0.0,
                config: None,
            },
            switch,
        })
    }
}

impl Motor for FaultyMotor {
    fn channel(&self) -> Channel {
        self.inner.channel
    }

    fn set_effort(&mut self, effort: f64) -> Result<(), RobotError> {
        if self.switch.is_tripped() {
            return Err(RobotError::HardwareFault {
                channel: self.inner.channel,
                details: "simulated controller fault".to_string(),
            });
        }
        self.inner.set_effort(effort)
    }

    fn effort(&self) -> f64 {
        self.inner.effort()
    }

    fn configure(&mut self, config: &MotorConfig) -> Result<(), RobotError> {
        self.inner.configure(config)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimBank builder
// ────────────────────────────────────────────────────────────────────────────

/// Builder that constructs an [`ActuatorBank`] pre-populated with simulated
/// motors.
#[derive(Default)]
pub struct SimBank {
    motors: Vec<Box<dyn Motor>>,
}

impl SimBank {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A bank with every channel of the robot simulated.
    pub fn full() -> ActuatorBank {
        Self::new()
            .with_drivetrain()
            .with_roller()
            .with_arm()
            .with_climber()
            .build()
    }

    /// Register simulated left and right drive channels.
    pub fn with_drivetrain(mut self) -> Self {
        self.motors.push(SimMotor::new(Channel::DriveLeft));
        self.motors.push(SimMotor::new(Channel::DriveRight));
        self
    }

    pub fn with_roller(mut self) -> Self {
        self.motors.push(SimMotor::new(Channel::Roller));
        self
    }

    pub fn with_arm(mut self) -> Self {
        self.motors.push(SimMotor::new(Channel::Arm));
        self
    }

    pub fn with_climber(mut self) -> Self {
        self.motors.push(SimMotor::new(Channel::Climber));
        self
    }

    /// Register a custom driver, replacing any simulated motor added earlier on
    /// the same channel.
    pub fn with_motor(mut self, motor: Box<dyn Motor>) -> Self {
        self.motors.push(motor);
        self
    }

    /// Consume the builder and return the configured bank.
    pub fn build(self) -> ActuatorBank {
        let mut bank = ActuatorBank::new();
        for motor in self.motors {
            bank.register(motor);
        }
        bank
    }
}
