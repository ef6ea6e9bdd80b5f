//! [`ActuatorBank`] – central motor registry.
//!
//! The bank stores every registered [`Motor`] keyed by its [`Channel`].  It is
//! owned by the scheduler, which hands commands a restricted view of it; the
//! bank itself enforces only the value contract:
//!
//! - efforts must be finite, otherwise the call fails with
//!   [`RobotError::HardwareFault`] and the motor is left untouched;
//! - finite efforts are clamped to [-1, 1] before reaching the driver.

use std::collections::BTreeMap;

use reefbot_types::{ActuatorId, Channel, MotorConfig, RobotError};
use tracing::{debug, warn};

use crate::motor::Motor;

/// Registry of motor drivers, one per [`Channel`].
#[derive(Default)]
pub struct ActuatorBank {
    motors: BTreeMap<Channel, Box<dyn Motor>>,
}

impl ActuatorBank {
    /// Create an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a motor driver.  Any previously registered driver on the same
    /// channel is replaced.
    pub fn register(&mut self, motor: Box<dyn Motor>) {
        self.motors.insert(motor.channel(), motor);
    }

    /// `true` when a driver is registered for `channel`.
    pub fn contains(&self, channel: Channel) -> bool {
        self.motors.contains_key(&channel)
    }

    /// `true` when every channel of `actuator` has a driver.
    pub fn has_actuator(&self, actuator: ActuatorId) -> bool {
        actuator.channels().iter().all(|c| self.contains(*c))
    }

    /// Registered channels in ascending order.
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.motors.keys().copied()
    }

    /// Command `effort` on `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::HardwareFault`] when the channel has no driver,
    /// when `effort` is not finite, or when the driver call fails.
    pub fn set_effort(&mut self, channel: Channel, effort: f64) -> Result<(), RobotError> {
        if !effort.is_finite() {
            return Err(RobotError::HardwareFault {
                channel,
                details: format!("effort {effort} is not a finite number"),
            });
        }
        let motor = self.motor_mut(channel)?;
        motor.set_effort(effort.clamp(-1.0, 1.0))
    }

    /// The most recently commanded effort, or `None` for an unregistered
    /// channel.
    pub fn effort(&self, channel: Channel) -> Option<f64> {
        self.motors.get(&channel).map(|m| m.effort())
    }

    /// Apply the startup configuration to every registered motor.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::Config`] when a registered channel has no entry in
    /// `configs`, or the driver's error when it rejects its configuration.
    pub fn configure_all(
        &mut self,
        configs: &BTreeMap<Channel, MotorConfig>,
    ) -> Result<(), RobotError> {
        for (channel, motor) in self.motors.iter_mut() {
            let config = configs.get(channel).ok_or_else(|| {
                RobotError::Config(format!("no motor configuration for channel '{channel}'"))
            })?;
            motor.configure(config)?;
            debug!(
                %channel,
                can_id = config.can_id,
                current_limit_amps = config.current_limit_amps,
                voltage_comp_volts = config.voltage_comp_volts,
                "motor configured"
            );
        }
        Ok(())
    }

    /// Zero every channel.  All channels are attempted even if one fails; the
    /// first failure is returned.
    pub fn stop_all(&mut self) -> Result<(), RobotError> {
        let mut first_err = None;
        for (channel, motor) in self.motors.iter_mut() {
            if let Err(e) = motor.set_effort(0.0) {
                warn!(%channel, error = %e, "failed to stop motor");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn motor_mut(&mut self, channel: Channel) -> Result<&mut Box<dyn Motor>, RobotError> {
        self.motors
            .get_mut(&channel)
            .ok_or_else(|| RobotError::HardwareFault {
                channel,
                details: format!("channel '{channel}' is not registered"),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::sim::{FaultSwitch, FaultyMotor, SimMotor};

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    /// Records the configuration it receives so tests can assert on it.
    struct RecordingMotor {
        channel: Channel,
        configured: Arc<Mutex<Option<MotorConfig>>>,
    }

    impl Motor for RecordingMotor {
        fn channel(&self) -> Channel {
            self.channel
        }
        fn set_effort(&mut self, _effort: f64) -> Result<(), RobotError> {
            Ok(())
        }
        fn effort(&self) -> f64 {
            0.0
        }
        fn configure(&mut self, config: &MotorConfig) -> Result<(), RobotError> {
            *self.configured.lock().unwrap() = Some(config.clone());
            Ok(())
        }
    }

    fn config(can_id: u8) -> MotorConfig {
        MotorConfig {
            can_id,
            follower_can_id: None,
            current_limit_amps: 60,
            voltage_comp_volts: 12.0,
        }
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[test]
    fn set_effort_reaches_registered_motor() {
        let mut bank = ActuatorBank::new();
        bank.register(SimMotor::new(Channel::Roller));

        bank.set_effort(Channel::Roller, -0.8).unwrap();
        assert_eq!(bank.effort(Channel::Roller), Some(-0.8));
    }

    #[test]
    fn out_of_range_effort_is_clamped() {
        let mut bank = ActuatorBank::new();
        bank.register(SimMotor::new(Channel::Climber));

        bank.set_effort(Channel::Climber, 1.8).unwrap();
        assert_eq!(bank.effort(Channel::Climber), Some(1.0));
        bank.set_effort(Channel::Climber, -4.0).unwrap();
        assert_eq!(bank.effort(Channel::Climber), Some(-1.0));
    }

    #[test]
    fn non_finite_effort_is_rejected_and_motor_untouched() {
        let mut bank = ActuatorBank::new();
        bank.register(SimMotor::new(Channel::Arm));
        bank.set_effort(Channel::Arm, 0.1).unwrap();

        let result = bank.set_effort(Channel::Arm, f64::NAN);
        assert!(matches!(result, Err(RobotError::HardwareFault { .. })));
        assert_eq!(bank.effort(Channel::Arm), Some(0.1));
    }

    #[test]
    fn missing_channel_returns_error() {
        let mut bank = ActuatorBank::new();
        let result = bank.set_effort(Channel::DriveLeft, 0.5);
        assert!(matches!(
            result,
            Err(RobotError::HardwareFault {
                channel: Channel::DriveLeft,
                ..
            })
        ));
        assert_eq!(bank.effort(Channel::DriveLeft), None);
    }

    #[test]
    fn has_actuator_requires_every_channel() {
        let mut bank = ActuatorBank::new();
        bank.register(SimMotor::new(Channel::DriveLeft));
        assert!(!bank.has_actuator(ActuatorId::Drivetrain));
        bank.register(SimMotor::new(Channel::DriveRight));
        assert!(bank.has_actuator(ActuatorId::Drivetrain));
    }

    #[test]
    fn re_registering_replaces_old_driver() {
        let mut bank = ActuatorBank::new();
        bank.register(SimMotor::new(Channel::Roller));
        bank.set_effort(Channel::Roller, 0.4).unwrap();

        bank.register(SimMotor::new(Channel::Roller));
        assert_eq!(bank.effort(Channel::Roller), Some(0.0));
    }

    #[test]
    fn configure_all_applies_matching_entry() {
        let configured = Arc::new(Mutex::new(None));
        let mut bank = ActuatorBank::new();
        bank.register(Box::new(RecordingMotor {
            channel: Channel::Arm,
            configured: configured.clone(),
        }));

        let configs = BTreeMap::from([(Channel::Arm, config(6)), (Channel::Roller, config(5))]);
        bank.configure_all(&configs).unwrap();

        assert_eq!(configured.lock().unwrap().as_ref(), Some(&config(6)));
    }

    #[test]
    fn configure_all_fails_for_unconfigured_channel() {
        let mut bank = ActuatorBank::new();
        bank.register(SimMotor::new(Channel::Arm));
        let result = bank.configure_all(&BTreeMap::new());
        assert!(matches!(result, Err(RobotError::Config(_))));
    }

    #[test]
    fn stop_all_zeroes_every_channel_even_after_a_failure() {
        let switch = FaultSwitch::new();
        let mut bank = ActuatorBank::new();
        bank.register(FaultyMotor::new(Channel::Arm, switch.clone()));
        bank.register(SimMotor::new(Channel::Roller));
        bank.set_effort(Channel::Roller, 0.4).unwrap();

        switch.trip();
        assert!(bank.stop_all().is_err());
        assert_eq!(bank.effort(Channel::Roller), Some(0.0));
    }
}
