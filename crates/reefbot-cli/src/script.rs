//! Scripted driver input for the simulated match.
//!
//! A script is a TOML list of frames.  Each frame holds one controller
//! snapshot for a number of ticks; frames play back to back and the
//! controller reads idle once the script is exhausted.
//!
//! ```toml
//! [[frame]]
//! ticks = 50
//! left_y = -1.0          # full forward
//!
//! [[frame]]
//! ticks = 25
//! buttons = ["right_bumper"]
//! pov = 90
//! ```

use std::fs;
use std::path::Path;

use reefbot_types::{Axis, Button, ControllerState, RobotError};
use serde::Deserialize;

/// One held controller snapshot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Frame {
    pub ticks: u32,
    pub left_x: f64,
    pub left_y: f64,
    pub right_x: f64,
    pub right_y: f64,
    pub left_trigger: f64,
    pub right_trigger: f64,
    pub buttons: Vec<Button>,
    pub pov: Option<u16>,
}

impl Frame {
    pub fn state(&self) -> ControllerState {
        let mut state = ControllerState::default()
            .with_axis(Axis::LeftX, self.left_x)
            .with_axis(Axis::LeftY, self.left_y)
            .with_axis(Axis::RightX, self.right_x)
            .with_axis(Axis::RightY, self.right_y)
            .with_axis(Axis::LeftTrigger, self.left_trigger)
            .with_axis(Axis::RightTrigger, self.right_trigger)
            .with_pov(self.pov);
        for button in &self.buttons {
            state = state.with_button(*button);
        }
        state
    }
}

#[derive(Debug, Default, Deserialize)]
struct ScriptFile {
    #[serde(default)]
    frame: Vec<Frame>,
}

/// A loaded input script.
#[derive(Debug, Clone, Default)]
pub struct InputScript {
    frames: Vec<Frame>,
}

impl InputScript {
    /// # Errors
    ///
    /// [`RobotError::Config`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, RobotError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            RobotError::Config(format!("failed to read script at {}: {e}", path.display()))
        })?;
        Self::parse(&raw)
    }

    /// # Errors
    ///
    /// [`RobotError::Config`] for malformed TOML or unknown fields.
    pub fn parse(raw: &str) -> Result<Self, RobotError> {
        let file: ScriptFile = toml::from_str(raw)
            .map_err(|e| RobotError::Config(format!("failed to parse input script: {e}")))?;
        Ok(Self { frames: file.frame })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Ticks covered by all frames together.
    pub fn total_ticks(&self) -> u64 {
        self.frames.iter().map(|f| u64::from(f.ticks)).sum()
    }

    /// Controller snapshot for the zero-based `tick`.
    pub fn state_at(&self, tick: u64) -> ControllerState {
        let mut start = 0u64;
        for frame in &self.frames {
            let end = start + u64::from(frame.ticks);
            if tick < end {
                return frame.state();
            }
            start = end;
        }
        ControllerState::default()
    }
}
