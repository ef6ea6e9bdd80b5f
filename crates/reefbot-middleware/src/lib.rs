//! `reefbot-middleware` – Telemetry Fan-out
//!
//! Carries what the control loop reports (ownership changes, command faults,
//! mode changes) to whoever is listening, without ever blocking the loop.
//!
//! # Modules
//!
//! - [`bus`] – topic-based publish/subscribe event bus built on Tokio
//!   broadcast channels.  [`EventBus`] implements
//!   [`EventSink`][reefbot_types::EventSink], so the scheduler can publish
//!   into it directly.

pub mod bus;

pub use bus::{EventBus, Topic, TopicReceiver};
