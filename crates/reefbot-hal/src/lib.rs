//! `reefbot-hal` – Hardware Abstraction Layer
//!
//! Everything above this crate talks to motors through the [`Motor`] trait
//! and the [`ActuatorBank`] registry, so real controllers and simulated ones
//! are interchangeable.
//!
//! # Modules
//!
//! - [`motor`] – [`Motor`][motor::Motor]: effort-controlled output channel.
//! - [`bank`] – [`ActuatorBank`][bank::ActuatorBank]: channel registry with
//!   effort validation and one-shot startup configuration.
//! - [`drive`] – [`arcade_mix`][drive::arcade_mix]: forward/rotation to
//!   left/right effort decomposition.
//! - [`sim`] – [`SimBank`][sim::SimBank]: in-process motors for tests and the
//!   simulated match.

pub mod bank;
pub mod drive;
pub mod motor;
pub mod sim;

pub use bank::ActuatorBank;
pub use drive::{WheelEfforts, arcade_mix};
pub use motor::Motor;
pub use sim::{FaultSwitch, FaultyMotor, SimBank, SimMotor};
