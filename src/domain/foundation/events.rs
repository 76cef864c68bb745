//! Outbound notification envelope.
//!
//! Every committed lifecycle transition is announced to live subscribers
//! as one or more topic-addressed notifications. The envelope is stable:
//! upstream transports (WebSocket, SSE) forward it verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

use super::{Timestamp, Topic};

/// Unique identifier for a notification (deduplication on slow clients).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Creates a new random EventId using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates an EventId from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Topic-addressed notification delivered to live connections.
///
/// One lifecycle transition may produce several notifications (the same
/// payload addressed to a workflow topic and to its tender topic, for
/// example); each is delivered independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique id for this notification instance.
    pub event_id: EventId,

    /// Channel the notification is addressed to.
    pub topic: Topic,

    /// Event type for client-side routing (e.g. "workflow.advanced").
    pub event_type: String,

    /// Id of the entity the event concerns, as a string.
    pub entity_id: String,

    /// Event-specific payload as JSON.
    pub payload: JsonValue,

    /// When the underlying transition occurred.
    pub occurred_at: Timestamp,
}

impl Notification {
    /// Creates a notification addressed to one topic.
    pub fn new(
        topic: Topic,
        event_type: impl Into<String>,
        entity_id: impl fmt::Display,
        payload: JsonValue,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            topic,
            event_type: event_type.into(),
            entity_id: entity_id.to_string(),
            payload,
            occurred_at: Timestamp::now(),
        }
    }

    /// Re-addresses a copy of this notification to another topic.
    ///
    /// The copy gets its own event id; delivery tracking is per
    /// (topic, notification) pair.
    pub fn readdressed(&self, topic: Topic) -> Self {
        Self {
            event_id: EventId::new(),
            topic,
            event_type: self.event_type.clone(),
            entity_id: self.entity_id.clone(),
            payload: self.payload.clone(),
            occurred_at: self.occurred_at,
        }
    }
}
