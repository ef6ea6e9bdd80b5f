//! `reefbot-runtime` – The Robot Program
//!
//! Turns the kernel's generic scheduling machinery into this robot: concrete
//! commands, autonomous routines, the controller bindings and the match mode
//! state machine.
//!
//! # Modules
//!
//! - [`config`] – [`RobotConfig`]: every robot constant with serde defaults
//!   and load-time validation.
//! - [`commands`] – [`DriveCommand`][commands::DriveCommand],
//!   [`EffortCommand`][commands::EffortCommand] and
//!   [`AutoDrive`][commands::AutoDrive].
//! - [`autos`] – the "Coral Auto" and "Drive Forward Auto" routines.
//! - [`robot`] – [`Robot`]: registers everything with one scheduler and
//!   switches between disabled, autonomous and teleop.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with optional OTLP export.

pub mod autos;
pub mod commands;
pub mod config;
pub mod robot;
pub mod telemetry;

pub use config::RobotConfig;
pub use robot::{Robot, RobotCommands, RobotMode};
