//! Topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels so that every subscriber
//! receives every message and a slow subscriber never holds up the control
//! loop: it lags and loses the oldest events instead.
//!
//! # Topics
//!
//! | Topic | Traffic |
//! |---|---|
//! | [`Topic::Telemetry`] | Actuator ownership snapshots |
//! | [`Topic::Modes`] | Robot mode changes and the locked-in autonomous routine |
//! | [`Topic::Faults`] | Commands that were forcibly ended by an error |

use chrono::Utc;
use reefbot_types::{Event, EventPayload, EventSink, RobotError};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Routing lanes of the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Telemetry,
    Modes,
    Faults,
}

impl Topic {
    /// The lane a payload is published on.
    pub fn of(payload: &EventPayload) -> Self {
        match payload {
            EventPayload::Ownership(_) => Topic::Telemetry,
            EventPayload::ModeSelected { .. } | EventPayload::RobotModeChanged { .. } => Topic::Modes,
            EventPayload::CommandFault { .. } => Topic::Faults,
        }
    }
}

/// Shared event bus.  Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    telemetry: broadcast::Sender<Event>,
    modes: broadcast::Sender<Event>,
    faults: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus.  `capacity` applies to every topic independently.
    pub fn new(capacity: usize) -> Self {
        let (telemetry, _) = broadcast::channel(capacity);
        let (modes, _) = broadcast::channel(capacity);
        let (faults, _) = broadcast::channel(capacity);
        Self {
            telemetry,
            modes,
            faults,
        }
    }

    /// Publish `event` on `topic`.
    ///
    /// Returns the number of receivers that were handed the event, or
    /// [`RobotError::Bus`] when nobody is subscribed to the topic.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, RobotError> {
        self.topic_sender(topic)
            .send(event)
            .map_err(|_| RobotError::Bus(format!("no subscribers for topic {topic:?}")))
    }

    /// Subscribe to a single topic.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Telemetry => &self.telemetry,
            Topic::Modes => &self.modes,
            Topic::Faults => &self.faults,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventSink for EventBus {
    /// Stamp the payload and route it by [`Topic::of`].  An event with no
    /// subscriber is dropped.
    fn publish(&self, source: &str, payload: EventPayload) {
        let topic = Topic::of(&payload);
        let event = Event {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.to_string(),
            payload,
        };
        if let Err(e) = self.publish_to(topic, event) {
            trace!(error = %e, "telemetry dropped");
        }
    }
}

/// An async receiver bound to a single [`Topic`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// `Err(RecvError::Lagged(n))` means `n` events were dropped because this
    /// receiver fell behind; `Err(RecvError::Closed)` means every sender is
    /// gone.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Non-blocking poll, for draining from the synchronous control loop.
    pub fn try_recv(&mut self) -> Result<Event, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }
}
