//! Arcade drive kinematics.
//!
//! `forward` is positive toward the front of the robot and `rotation` is
//! positive counter-clockwise.  Both sides are scaled down together when the
//! raw sum would exceed full effort, so the ratio between left and right (and
//! therefore the turn radius) is preserved.

/// Per-side drivetrain efforts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEfforts {
    pub left: f64,
    pub right: f64,
}

/// Decompose `(forward, rotation)` into left/right efforts in [-1, 1].
///
/// ```
/// use reefbot_hal::arcade_mix;
///
/// let w = arcade_mix(1.0, 0.0);
/// assert_eq!((w.left, w.right), (1.0, 1.0));
///
/// // Spinning in place counter-clockwise drives the left side backwards.
/// let w = arcade_mix(0.0, 0.5);
/// assert_eq!((w.left, w.right), (-0.5, 0.5));
/// ```
pub fn arcade_mix(forward: f64, rotation: f64) -> WheelEfforts {
    let forward = forward.clamp(-1.0, 1.0);
    let rotation = rotation.clamp(-1.0, 1.0);

    let left = forward - rotation;
    let right = forward + rotation;

    let greater = forward.abs().max(rotation.abs());
    let lesser = forward.abs().min(rotation.abs());
    if greater == 0.0 {
        return WheelEfforts {
            left: 0.0,
            right: 0.0,
        };
    }
    let saturated = (greater + lesser) / greater;

    WheelEfforts {
        left: left / saturated,
        right: right / saturated,
    }
}
