//! Shared handle to the driver's gamepad.
//!
//! The enclosing loop calls [`GamepadHandle::update`] with a fresh
//! [`ControllerState`] at the start of every tick.  Triggers and axis sources
//! built from the handle read that snapshot, so everything sampled within a
//! tick sees the same values.
//!
//! The handle is single-threaded (`Rc<Cell<_>>`): the scheduler and every
//! command run on the control loop thread.

use std::cell::Cell;
use std::rc::Rc;

use reefbot_types::{Axis, Button, ControllerState, RobotError};

use crate::trigger::Trigger;

/// Cloneable view of one gamepad's latest snapshot.
///
/// # Example
///
/// ```
/// use reefbot_kernel::controller::GamepadHandle;
/// use reefbot_types::{Axis, ControllerState};
///
/// let pad = GamepadHandle::new(0);
/// let forward = pad.axis_source(Axis::LeftY);
/// let slow = pad.left_bumper();
///
/// pad.update(ControllerState::default().with_axis(Axis::LeftY, -0.6));
/// assert_eq!(forward(), -0.6);
/// assert!(!slow.sample());
/// ```
#[derive(Clone)]
pub struct GamepadHandle {
    port: u8,
    state: Rc<Cell<ControllerState>>,
}

impl GamepadHandle {
    pub fn new(port: u8) -> Self {
        Self {
            port,
            state: Rc::new(Cell::new(ControllerState::default())),
        }
    }

    /// Driver-station port the gamepad is plugged into.
    pub fn port(&self) -> u8 {
        self.port
    }

    /// Replace the snapshot.  Call once per tick before the scheduler runs.
    pub fn update(&self, state: ControllerState) {
        self.state.set(state);
    }

    pub fn state(&self) -> ControllerState {
        self.state.get()
    }

    /// A `Fn() -> f64` capability reading `axis` from the latest snapshot.
    pub fn axis_source(&self, axis: Axis) -> impl Fn() -> f64 + 'static {
        let state = self.state.clone();
        move || state.get().axis(axis)
    }

    /// Active while `button` is held.
    pub fn button(&self, button: Button) -> Trigger {
        let state = self.state.clone();
        Trigger::new(move || state.get().button(button))
    }

    pub fn a(&self) -> Trigger {
        self.button(Button::A)
    }

    pub fn b(&self) -> Trigger {
        self.button(Button::B)
    }

    pub fn x(&self) -> Trigger {
        self.button(Button::X)
    }

    pub fn y(&self) -> Trigger {
        self.button(Button::Y)
    }

    pub fn left_bumper(&self) -> Trigger {
        self.button(Button::LeftBumper)
    }

    pub fn right_bumper(&self) -> Trigger {
        self.button(Button::RightBumper)
    }

    /// Active while the POV hat points exactly at `angle` degrees.
    ///
    /// # Errors
    ///
    /// Only the cardinal directions (0, 90, 180, 270) may be bound;
    /// anything else is a [`RobotError::InvalidBinding`].
    pub fn pov(&self, angle: u16) -> Result<Trigger, RobotError> {
        if angle % 90 != 0 || angle >= 360 {
            return Err(RobotError::InvalidBinding(format!(
                "POV angle {angle} is not a cardinal direction"
            )));
        }
        let state = self.state.clone();
        Ok(Trigger::new(move || state.get().pov() == Some(angle)))
    }

    /// Active while `axis` reads strictly above `threshold`.
    ///
    /// # Errors
    ///
    /// [`RobotError::InvalidBinding`] when `threshold` is not within [-1, 1).
    pub fn axis_above(&self, axis: Axis, threshold: f64) -> Result<Trigger, RobotError> {
        if !(threshold.is_finite() && (-1.0..1.0).contains(&threshold)) {
            return Err(RobotError::InvalidBinding(format!(
                "axis threshold {threshold} can never be crossed"
            )));
        }
        Ok(Trigger::axis_above(self.axis_source(axis), threshold))
    }

    /// Active while the right trigger is pressed past `threshold`.
    pub fn right_trigger(&self, threshold: f64) -> Result<Trigger, RobotError> {
        self.axis_above(Axis::RightTrigger, threshold)
    }

    /// Active while the left trigger is pressed past `threshold`.
    pub fn left_trigger(&self, threshold: f64) -> Result<Trigger, RobotError> {
        self.axis_above(Axis::LeftTrigger, threshold)
    }
}
