//! Joystick input conditioning.
//!
//! Raw stick samples near the center are noise: a released stick rarely
//! reads exactly zero.  [`InputConditioner`] zeroes everything within the
//! deadband and linearly rescales the remaining range so that full deflection
//! still produces full output:
//!
//! ```text
//! |raw| <= d  ->  0
//! |raw| >  d  ->  sign(raw) * (|raw| - d) / (1 - d)
//! ```
//!
//! Squared shaping, when requested, is applied after the deadband and keeps
//! the sign: `sign(x) * x^2`.
//!
//! # Example
//!
//! ```
//! use reefbot_kernel::conditioner::InputConditioner;
//!
//! let conditioner = InputConditioner::new(0.1).unwrap();
//! assert_eq!(conditioner.condition(0.05), 0.0);
//! assert!((conditioner.condition(0.55) - 0.5).abs() < 1e-12);
//! assert_eq!(conditioner.condition(-1.0), -1.0);
//! assert!((conditioner.condition_with(0.55, true) - 0.25).abs() < 1e-12);
//! ```

use reefbot_types::RobotError;

/// Validated deadband width in [0, 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deadband(f64);

impl Deadband {
    /// # Errors
    ///
    /// Returns [`RobotError::InvalidDeadband`] when `width` is not finite or
    /// lies outside [0, 1).
    pub fn new(width: f64) -> Result<Self, RobotError> {
        if width.is_finite() && (0.0..1.0).contains(&width) {
            Ok(Self(width))
        } else {
            Err(RobotError::InvalidDeadband(width))
        }
    }

    pub fn width(self) -> f64 {
        self.0
    }
}

/// Stateless deadband + optional squaring stage between a raw axis and a
/// drivetrain command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputConditioner {
    deadband: Deadband,
}

impl InputConditioner {
    /// # Errors
    ///
    /// Returns [`RobotError::InvalidDeadband`] for a width outside [0, 1).
    pub fn new(deadband: f64) -> Result<Self, RobotError> {
        Ok(Self {
            deadband: Deadband::new(deadband)?,
        })
    }

    pub fn deadband(&self) -> Deadband {
        self.deadband
    }

    /// Apply the deadband and rescale.  Non-finite samples are treated as no
    /// input; samples outside [-1, 1] are clamped first.
    pub fn condition(&self, raw: f64) -> f64 {
        if !raw.is_finite() {
            return 0.0;
        }
        let raw = raw.clamp(-1.0, 1.0);
        let d = self.deadband.width();
        if raw.abs() <= d {
            return 0.0;
        }
        ((raw.abs() - d) / (1.0 - d)).copysign(raw)
    }

    /// [`condition`][Self::condition], then square the magnitude when
    /// `squared` is set.
    pub fn condition_with(&self, raw: f64, squared: bool) -> f64 {
        let value = self.condition(raw);
        if squared {
            (value * value).copysign(value)
        } else {
            value
        }
    }
}
