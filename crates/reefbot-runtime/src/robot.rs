//! [`Robot`] – wires configuration, commands, bindings and autonomous
//! routines into one [`Scheduler`] and runs the match mode state machine.
//!
//! # Bindings
//!
//! | Input | Command | Effort |
//! |---|---|---|
//! | (default) | `Drive` | left Y forward, right X rotation |
//! | left bumper | `SlowDrive` | `Drive` on sticks pre-scaled by `drive.slow_*` |
//! | right bumper | `AlgaeIn` | `roller.algae_in` |
//! | right trigger | `AlgaeOut` | `roller.algae_out` |
//! | X | `CoralOut` | `roller.coral_out` |
//! | Y | `CoralStack` | `roller.coral_stack` |
//! | POV 90 / 270 | `ArmUp` / `ArmDown` | `arm.speed_*`, then `arm.hold_*` |
//! | POV 0 / 180 | `ClimberUp` / `ClimberDown` | `climber.speed_*` |
//!
//! Every binding is "while true".  They are registered in the order above,
//! so of two inputs pressed in the same tick for the same mechanism, the
//! later row wins.
//!
//! # Modes
//!
//! | Transition to | Effect |
//! |---|---|
//! | [`RobotMode::Autonomous`] | locks the mode selector and schedules the selected routine |
//! | [`RobotMode::Teleop`] | cancels the routine and unlocks the selector |
//! | [`RobotMode::Disabled`] | cancels every command, zeroes every channel and unlocks the selector |

use std::fmt;

use reefbot_hal::ActuatorBank;
use reefbot_kernel::{
    BindingKind, CommandHandle, GamepadHandle, InputConditioner, ModeSelector, Scheduler,
};
use reefbot_types::{ActuatorId, Axis, ControllerState, EventPayload, EventSink, RobotError};
use tracing::{info, warn};

use crate::autos::{self, DRIVE_FORWARD_AUTO};
use crate::commands::{DriveCommand, EffortCommand};
use crate::config::RobotConfig;

const SOURCE: &str = "reefbot-runtime::robot";

/// Match phase as reported by the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotMode {
    Disabled,
    Autonomous,
    Teleop,
}

impl fmt::Display for RobotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RobotMode::Disabled => write!(f, "disabled"),
            RobotMode::Autonomous => write!(f, "autonomous"),
            RobotMode::Teleop => write!(f, "teleop"),
        }
    }
}

/// Handles of every registered command.
#[derive(Debug, Clone, Copy)]
pub struct RobotCommands {
    pub drive: CommandHandle,
    pub slow_drive: CommandHandle,
    pub algae_in: CommandHandle,
    pub algae_out: CommandHandle,
    pub coral_out: CommandHandle,
    pub coral_stack: CommandHandle,
    pub arm_up: CommandHandle,
    pub arm_down: CommandHandle,
    pub climber_up: CommandHandle,
    pub climber_down: CommandHandle,
    pub coral_auto: CommandHandle,
    pub drive_forward_auto: CommandHandle,
}

/// The robot program.
pub struct Robot {
    scheduler: Scheduler,
    gamepad: GamepadHandle,
    modes: ModeSelector,
    commands: RobotCommands,
    mode: RobotMode,
    active_auto: Option<CommandHandle>,
}

impl Robot {
    /// Build the robot around `bank`, publishing telemetry to `sink`.
    ///
    /// Motors are configured from the motor table before anything else.
    ///
    /// # Errors
    ///
    /// [`RobotError::Config`] for an invalid configuration or a bank missing
    /// a mechanism; any motor configuration failure.
    pub fn new(
        config: &RobotConfig,
        mut bank: ActuatorBank,
        sink: Box<dyn EventSink>,
    ) -> Result<Self, RobotError> {
        config.validate()?;
        bank.configure_all(&config.motor_table())?;

        let period = config.control.period();
        let mut scheduler = Scheduler::new(bank).with_sink(sink).with_period(period);
        let gamepad = GamepadHandle::new(config.driver.port);
        let conditioner = InputConditioner::new(config.driver.deadband)?;

        let forward = {
            let left_y = gamepad.axis_source(Axis::LeftY);
            move || -left_y()
        };
        let rotation = {
            let right_x = gamepad.axis_source(Axis::RightX);
            move || -right_x()
        };
        let slow_forward = {
            let left_y = gamepad.axis_source(Axis::LeftY);
            let scale = config.drive.slow_move;
            move || -left_y() * scale
        };
        let slow_rotation = {
            let right_x = gamepad.axis_source(Axis::RightX);
            let scale = config.drive.slow_turn;
            move || -right_x() * scale
        };

        let squared = config.drive.squared_inputs;
        let drive = scheduler.register(
            DriveCommand::new("Drive", forward, rotation, conditioner).squared(squared),
        )?;
        let slow_drive = scheduler.register(
            DriveCommand::new("SlowDrive", slow_forward, slow_rotation, conditioner).squared(squared),
        )?;

        let roller = &config.roller;
        let arm = &config.arm;
        let climber = &config.climber;
        let mut effort = |name: &str, actuator, run, hold| {
            scheduler.register(EffortCommand::new(name, actuator, run).holding(hold))
        };
        let algae_in = effort("AlgaeIn", ActuatorId::Roller, roller.algae_in, 0.0)?;
        let algae_out = effort("AlgaeOut", ActuatorId::Roller, roller.algae_out, 0.0)?;
        let coral_out = effort("CoralOut", ActuatorId::Roller, roller.coral_out, 0.0)?;
        let coral_stack = effort("CoralStack", ActuatorId::Roller, roller.coral_stack, 0.0)?;
        let arm_up = effort("ArmUp", ActuatorId::Arm, arm.speed_up, arm.hold_up)?;
        let arm_down = effort("ArmDown", ActuatorId::Arm, arm.speed_down, arm.hold_down)?;
        let climber_up = effort("ClimberUp", ActuatorId::Climber, climber.speed_up, 0.0)?;
        let climber_down = effort("ClimberDown", ActuatorId::Climber, climber.speed_down, 0.0)?;

        let coral_auto = scheduler.register(autos::coral_auto(config, period)?)?;
        let drive_forward_auto = scheduler.register(autos::drive_forward_auto(config, period))?;

        scheduler.set_default_command(ActuatorId::Drivetrain, drive)?;

        let bindings = [
            (gamepad.left_bumper(), slow_drive),
            (gamepad.right_bumper(), algae_in),
            (gamepad.right_trigger(roller.algae_out_threshold)?, algae_out),
            (gamepad.x(), coral_out),
            (gamepad.y(), coral_stack),
            (gamepad.pov(90)?, arm_up),
            (gamepad.pov(270)?, arm_down),
            (gamepad.pov(0)?, climber_up),
            (gamepad.pov(180)?, climber_down),
        ];
        for (trigger, command) in bindings {
            scheduler.bind(trigger, BindingKind::WhileTrue, command)?;
        }

        let mut modes = ModeSelector::new(autos::CORAL_AUTO, coral_auto);
        modes.add_option(DRIVE_FORWARD_AUTO, drive_forward_auto)?;
        modes.select(&config.autonomous.default_mode)?;

        info!(
            port = config.driver.port,
            period_ms = config.control.period_ms,
            auto = %config.autonomous.default_mode,
            "robot initialised"
        );

        Ok(Self {
            scheduler,
            gamepad,
            modes,
            commands: RobotCommands {
                drive,
                slow_drive,
                algae_in,
                algae_out,
                coral_out,
                coral_stack,
                arm_up,
                arm_down,
                climber_up,
                climber_down,
                coral_auto,
                drive_forward_auto,
            },
            mode: RobotMode::Disabled,
            active_auto: None,
        })
    }

    pub fn mode(&self) -> RobotMode {
        self.mode
    }

    pub fn commands(&self) -> &RobotCommands {
        &self.commands
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn modes(&self) -> &ModeSelector {
        &self.modes
    }

    pub fn gamepad(&self) -> &GamepadHandle {
        &self.gamepad
    }

    /// Choose the autonomous routine.
    ///
    /// # Errors
    ///
    /// [`RobotError::ModeLocked`] during autonomous,
    /// [`RobotError::UnknownAutoMode`] for an unknown name.
    pub fn select_auto(&mut self, name: &str) -> Result<(), RobotError> {
        self.modes.select(name)
    }

    /// Switch match phase.  Re-entering the current mode does nothing.
    ///
    /// # Errors
    ///
    /// Only a failure to zero the outputs when disabling is returned; every
    /// other step has already been applied.
    pub fn set_mode(&mut self, mode: RobotMode) -> Result<(), RobotError> {
        if mode == self.mode {
            return Ok(());
        }
        info!(from = %self.mode, to = %mode, "robot mode change");
        self.mode = mode;
        self.scheduler.sink().publish(
            SOURCE,
            EventPayload::RobotModeChanged {
                mode: mode.to_string(),
            },
        );

        match mode {
            RobotMode::Autonomous => {
                let (name, routine) = self.modes.lock();
                let name = name.to_string();
                self.scheduler.schedule(routine)?;
                self.active_auto = Some(routine);
                info!(routine = %name, "autonomous routine scheduled");
                self.scheduler
                    .sink()
                    .publish(SOURCE, EventPayload::ModeSelected { mode: name });
                Ok(())
            }
            RobotMode::Teleop => {
                self.end_auto()?;
                Ok(())
            }
            RobotMode::Disabled => {
                self.end_auto()?;
                self.scheduler.cancel_all();
                self.scheduler.bank_mut().stop_all().inspect_err(|e| {
                    warn!(error = %e, "failed to zero outputs on disable");
                })
            }
        }
    }

    /// One control period: publish the driver's inputs, then tick the
    /// scheduler.  Nothing runs while disabled.
    pub fn periodic(&mut self, input: ControllerState) {
        self.gamepad.update(input);
        if self.mode != RobotMode::Disabled {
            self.scheduler.tick();
        }
    }

    fn end_auto(&mut self) -> Result<(), RobotError> {
        if let Some(routine) = self.active_auto.take() {
            self.scheduler.cancel(routine)?;
        }
        self.modes.unlock();
        Ok(())
    }
}
