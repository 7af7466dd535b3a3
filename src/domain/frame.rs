//! Server-sent-event frames.
//!
//! An [`SseFrame`] is one event as queued on a channel. It is rendered by
//! axum's [`Event`] when the session stream hands it to the response body,
//! which produces one complete block:
//!
//! ```text
//! event: <name>\n
//! data: <payload>\n
//! id: <id>\n          (only when an id is set)
//! \n
//! ```
//!
//! A frame is enqueued as a single unit, so two frames can never
//! interleave on the same stream.

use axum::response::sse::Event;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::notification::{NotificationEvent, OutboundNotification};
use super::UserId;

/// Event name of the acknowledgment sent when a stream opens.
pub const EVENT_CONNECTED: &str = "connected";
/// Event name of the periodic keep-alive.
pub const EVENT_HEARTBEAT: &str = "heartbeat";
/// Event name of a dispatched notification.
pub const EVENT_NOTIFICATION: &str = "notification";

/// A single event waiting to be written to a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    event: &'static str,
    data: String,
    id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectedPayload<'a> {
    user_id: &'a UserId,
    timestamp: DateTime<Utc>,
}

fn is_valid_field(value: &str) -> bool {
    !value.contains(['\n', '\r', '\0'])
}

impl SseFrame {
    /// Builds a frame from its parts.
    ///
    /// Carriage returns in `data` are folded into newlines; each line then
    /// becomes its own `data:` field when rendered. An `id` that cannot
    /// appear on a single field line is dropped.
    #[must_use]
    pub fn new(event: &'static str, data: impl Into<String>, id: Option<&str>) -> Self {
        let mut data = data.into();
        if data.contains('\r') {
            data = data.replace("\r\n", "\n").replace('\r', "\n");
        }
        let id = id.and_then(|id| {
            if is_valid_field(id) {
                Some(id.to_string())
            } else {
                tracing::warn!(id = ?id, "dropping event id containing a line break");
                None
            }
        });
        Self { event, data, id }
    }

    /// The `connected` acknowledgment: `{userId, timestamp}`.
    #[must_use]
    pub fn connected(user_id: &UserId, timestamp: DateTime<Utc>) -> Self {
        let payload = ConnectedPayload { user_id, timestamp };
        let data = serde_json::to_string(&payload).unwrap_or_default();
        Self::new(EVENT_CONNECTED, data, None)
    }

    /// The keep-alive frame, payload `ping`.
    #[must_use]
    pub fn heartbeat() -> Self {
        Self::new(EVENT_HEARTBEAT, "ping", None)
    }

    /// A `notification` frame for `event`, stamped with `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the event cannot be serialized.
    pub fn notification(
        event: &NotificationEvent,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        let data = serde_json::to_string(&OutboundNotification { event, timestamp })?;
        Ok(Self::new(
            EVENT_NOTIFICATION,
            data,
            Some(event.message_id.as_str()),
        ))
    }

    /// Event name.
    #[must_use]
    pub const fn event(&self) -> &'static str {
        self.event
    }

    /// Payload text.
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Event id, set on notification frames.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Converts the frame into the axum event that renders it.
    #[must_use]
    pub fn into_event(self) -> Event {
        let event = Event::default().event(self.event).data(self.data);
        match self.id {
            Some(id) => event.id(id),
            None => event,
        }
    }
}

impl From<SseFrame> for Event {
    fn from(frame: SseFrame) -> Self {
        frame.into_event()
    }
}
