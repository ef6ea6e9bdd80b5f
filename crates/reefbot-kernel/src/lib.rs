//! `reefbot-kernel` – Command Scheduling & Arbitration
//!
//! Decides, every tick, which command drives which mechanism.  Commands never
//! touch motors directly; the kernel hands each lifecycle step a restricted
//! [`Outputs`] view of the actuators it currently owns.
//!
//! # Modules
//!
//! - [`command`] – the [`Command`] trait, [`CommandHandle`] and the
//!   ownership-checked [`Outputs`] handle.
//! - [`scheduler`] – [`Scheduler`]: runs the per-tick pipeline (poll
//!   bindings, resolve ownership, execute, finish, fill defaults) and contains
//!   command faults.
//! - [`ownership`] – [`OwnershipTable`][ownership::OwnershipTable]: the
//!   single source of truth for which command holds which actuator.
//! - [`trigger`] – [`Trigger`] conditions, [`BindingKind`] and the binding
//!   table with its registration-order precedence rule.
//! - [`controller`] – [`GamepadHandle`]: per-tick gamepad snapshot and the
//!   triggers and axis sources built from it.
//! - [`conditioner`] – [`InputConditioner`]: deadband and squared shaping for
//!   stick axes.
//! - [`group`] – sequence, parallel, race, wait and timeout composition.
//! - [`mode_selector`] – [`ModeSelector`]: the autonomous routine chooser.
//! - [`watchdog`] – [`TickWatchdog`]: loop overrun detection.

pub mod command;
pub mod conditioner;
pub mod controller;
pub mod group;
pub mod mode_selector;
pub mod ownership;
pub mod scheduler;
pub mod trigger;
pub mod watchdog;

pub use command::{Command, CommandHandle, CommandState, Outputs};
pub use conditioner::{Deadband, InputConditioner};
pub use controller::GamepadHandle;
pub use group::{CommandExt, Parallel, Race, Sequence, Timeout, Wait, ticks_for};
pub use mode_selector::ModeSelector;
pub use scheduler::Scheduler;
pub use trigger::{BindingKind, Trigger};
pub use watchdog::{Overrun, TickWatchdog};
