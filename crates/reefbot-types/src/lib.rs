use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A physical mechanism that commands compete for.  The scheduler grants each
/// actuator to at most one command at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorId {
    /// Differential drive base (left and right channels).
    Drivetrain,
    /// Intake / scoring roller.
    Roller,
    /// Pivoting arm.
    Arm,
    /// Winch climber.
    Climber,
}

impl ActuatorId {
    /// Every actuator, in arbitration order.
    pub const ALL: [ActuatorId; 4] = [
        ActuatorId::Drivetrain,
        ActuatorId::Roller,
        ActuatorId::Arm,
        ActuatorId::Climber,
    ];

    /// The output channels that belong to this actuator.
    pub fn channels(self) -> &'static [Channel] {
        match self {
            ActuatorId::Drivetrain => &[Channel::DriveLeft, Channel::DriveRight],
            ActuatorId::Roller => &[Channel::Roller],
            ActuatorId::Arm => &[Channel::Arm],
            ActuatorId::Climber => &[Channel::Climber],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ActuatorId::Drivetrain => "drivetrain",
            ActuatorId::Roller => "roller",
            ActuatorId::Arm => "arm",
            ActuatorId::Climber => "climber",
        }
    }
}

impl fmt::Display for ActuatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single effort output.  The drivetrain owns two channels; every other
/// actuator owns exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    DriveLeft,
    DriveRight,
    Roller,
    Arm,
    Climber,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::DriveLeft,
        Channel::DriveRight,
        Channel::Roller,
        Channel::Arm,
        Channel::Climber,
    ];

    /// The actuator this channel belongs to.
    pub fn actuator(self) -> ActuatorId {
        match self {
            Channel::DriveLeft | Channel::DriveRight => ActuatorId::Drivetrain,
            Channel::Roller => ActuatorId::Roller,
            Channel::Arm => ActuatorId::Arm,
            Channel::Climber => ActuatorId::Climber,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::DriveLeft => "drive_left",
            Channel::DriveRight => "drive_right",
            Channel::Roller => "roller",
            Channel::Arm => "arm",
            Channel::Climber => "climber",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Startup configuration applied once to every motor controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorConfig {
    /// CAN id of the leading controller.
    pub can_id: u8,
    /// CAN id of a controller that mirrors the leader, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follower_can_id: Option<u8>,
    /// Smart current limit in amps.
    pub current_limit_amps: u32,
    /// Nominal voltage used for voltage compensation.
    pub voltage_comp_volts: f64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Controller snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// Analog inputs of a gamepad.  Sticks report [-1, 1]; triggers report [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    LeftX,
    LeftY,
    RightX,
    RightY,
    LeftTrigger,
    RightTrigger,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::LeftX => 0,
            Axis::LeftY => 1,
            Axis::RightX => 2,
            Axis::RightY => 3,
            Axis::LeftTrigger => 4,
            Axis::RightTrigger => 5,
        }
    }
}

/// Digital inputs of a gamepad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    Back,
    Start,
    LeftStick,
    RightStick,
}

impl Button {
    fn mask(self) -> u16 {
        1 << (self as u16)
    }
}

/// One sample of the full controller state, taken fresh every tick.
///
/// ```
/// use reefbot_types::{Axis, Button, ControllerState};
///
/// let state = ControllerState::default()
///     .with_axis(Axis::LeftY, -0.5)
///     .with_button(Button::X)
///     .with_pov(Some(90));
///
/// assert_eq!(state.axis(Axis::LeftY), -0.5);
/// assert!(state.button(Button::X));
/// assert!(!state.button(Button::Y));
/// assert_eq!(state.pov(), Some(90));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerState {
    axes: [f64; 6],
    buttons: u16,
    pov: Option<u16>,
}

impl ControllerState {
    pub fn with_axis(mut self, axis: Axis, value: f64) -> Self {
        self.axes[axis.index()] = value;
        self
    }

    pub fn with_button(mut self, button: Button) -> Self {
        self.buttons |= button.mask();
        self
    }

    /// Set the POV hat angle in degrees (`None` when the hat is released).
    pub fn with_pov(mut self, pov: Option<u16>) -> Self {
        self.pov = pov;
        self
    }

    pub fn axis(&self, axis: Axis) -> f64 {
        self.axes[axis.index()]
    }

    pub fn button(&self, button: Button) -> bool {
        self.buttons & button.mask() != 0
    }

    pub fn pov(&self) -> Option<u16> {
        self.pov
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Telemetry events
// ─────────────────────────────────────────────────────────────────────────────

/// Unified event wrapper for the telemetry bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "reefbot-kernel::scheduler"
    pub source: String,
    pub payload: EventPayload,
}

/// Variants of data produced by the control layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// The autonomous routine locked in at the start of the autonomous period.
    ModeSelected { mode: String },
    /// The robot switched between disabled, autonomous and teleop.
    RobotModeChanged { mode: String },
    /// A command failed and was forcibly ended.
    CommandFault { command: String, details: String },
    /// Current owner of every registered actuator.
    Ownership(Vec<OwnershipEntry>),
}

impl EventPayload {
    /// `true` for payloads that report a failure.
    pub fn is_fault(&self) -> bool {
        matches!(self, EventPayload::CommandFault { .. })
    }
}

/// Who holds an actuator right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipEntry {
    pub actuator: ActuatorId,
    /// Name of the owning command, `None` when the actuator is free.
    pub command: Option<String>,
}

/// Fire-and-forget destination for telemetry.  Implementations must never
/// block and must swallow delivery failures.
pub trait EventSink {
    fn publish(&self, source: &str, payload: EventPayload);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _source: &str, _payload: EventPayload) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Global error type spanning configuration mistakes, actuation faults and
/// command failures.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RobotError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Deadband {0} is outside [0, 1)")]
    InvalidDeadband(f64),

    #[error("Invalid Trigger Binding: {0}")]
    InvalidBinding(String),

    #[error("Unknown command handle #{0}")]
    UnknownCommand(usize),

    #[error("Hardware Fault on {channel}: {details}")]
    HardwareFault { channel: Channel, details: String },

    #[error("Command '{command}' does not own {channel}")]
    NotOwner { command: String, channel: Channel },

    #[error("Command '{command}' faulted: {details}")]
    CommandFault { command: String, details: String },

    #[error("Unknown autonomous mode '{0}'")]
    UnknownAutoMode(String),

    #[error("Autonomous selection is locked to '{0}'")]
    ModeLocked(String),

    #[error("Event Bus Error: {0}")]
    Bus(String),
}
