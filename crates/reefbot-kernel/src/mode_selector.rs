//! [`ModeSelector`] – the operator's choice of autonomous routine.
//!
//! The selection may change freely while the robot is disabled.  Entering
//! autonomous calls [`ModeSelector::lock`], which fixes the routine for the
//! rest of the period; [`ModeSelector::unlock`] reopens it when autonomous
//! ends.

use reefbot_types::RobotError;
use tracing::info;

use crate::command::CommandHandle;

/// Named autonomous routines with one current selection.
///
/// # Example
///
/// ```
/// use reefbot_kernel::{CommandHandle, ModeSelector};
///
/// let coral = CommandHandle::from_index(0);
/// let drive = CommandHandle::from_index(1);
///
/// let mut modes = ModeSelector::new("Coral Auto", coral);
/// modes.add_option("Drive Forward Auto", drive).unwrap();
/// modes.select("Drive Forward Auto").unwrap();
///
/// assert_eq!(modes.lock(), ("Drive Forward Auto", drive));
/// assert!(modes.select("Coral Auto").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ModeSelector {
    options: Vec<(String, CommandHandle)>,
    default: usize,
    selected: usize,
    locked: bool,
}

impl ModeSelector {
    /// Create a selector whose default (and initial selection) is `name`.
    pub fn new(name: impl Into<String>, command: CommandHandle) -> Self {
        Self {
            options: vec![(name.into(), command)],
            default: 0,
            selected: 0,
            locked: false,
        }
    }

    /// # Errors
    ///
    /// [`RobotError::Config`] when an option with the same name exists.
    pub fn add_option(&mut self, name: impl Into<String>, command: CommandHandle) -> Result<(), RobotError> {
        let name = name.into();
        if self.position(&name).is_some() {
            return Err(RobotError::Config(format!("duplicate autonomous mode '{name}'")));
        }
        self.options.push((name, command));
        Ok(())
    }

    /// Change the selection.
    ///
    /// # Errors
    ///
    /// [`RobotError::ModeLocked`] during autonomous;
    /// [`RobotError::UnknownAutoMode`] when no option is called `name`.
    pub fn select(&mut self, name: &str) -> Result<(), RobotError> {
        if self.locked {
            return Err(RobotError::ModeLocked(name.to_string()));
        }
        let index = self
            .position(name)
            .ok_or_else(|| RobotError::UnknownAutoMode(name.to_string()))?;
        self.selected = index;
        info!(mode = name, "autonomous mode selected");
        Ok(())
    }

    /// Return to the default option.  Ignored while locked.
    pub fn reset(&mut self) {
        if !self.locked {
            self.selected = self.default;
        }
    }

    pub fn selected(&self) -> (&str, CommandHandle) {
        let (name, command) = &self.options[self.selected];
        (name, *command)
    }

    /// Freeze the selection and return it.
    pub fn lock(&mut self) -> (&str, CommandHandle) {
        self.locked = true;
        self.selected()
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Option names in the order they were added.
    pub fn options(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|(name, _)| name.as_str())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.options.iter().position(|(n, _)| n == name)
    }
}
