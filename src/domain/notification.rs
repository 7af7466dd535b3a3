//! Canonical notification shape shared by the bus, the store, and the wire.
//!
//! A [`NotificationEvent`] is what a producer persists and publishes. The
//! broadcaster never originates one; it decodes it off the bus, refreshes
//! its [`DeliveryState`] from the store, and writes it to channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MessageId, RecipientDescriptor};

/// Delivery lifecycle of a persisted notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Persisted, not yet pushed to any live channel.
    #[default]
    Pending,
    /// Pushed to at least one live channel.
    Delivered,
    /// Acknowledged by the user.
    Read,
}

impl DeliveryStatus {
    /// Returns the lowercase wire string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "delivered" => Ok(Self::Delivered),
            "read" => Ok(Self::Read),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// Authoritative status and timestamps of a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryState {
    /// Current lifecycle status.
    #[serde(default)]
    pub status: DeliveryStatus,
    /// When the producer created the notification.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// When it was first pushed to a live channel.
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    /// When the user marked it read.
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

/// User-facing notification content.
///
/// Opaque to the fan-out engine: whatever JSON the producer published is
/// stored and written to clients unchanged. Conventional keys are
/// `title`, `content`, `category`, `priority` and `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationPayload(serde_json::Value);

impl NotificationPayload {
    /// Wraps a producer-supplied JSON value.
    #[must_use]
    pub const fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Looks up a top-level field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// The `title` field, when it is a string.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(serde_json::Value::as_str)
    }

    /// The underlying JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl Default for NotificationPayload {
    fn default() -> Self {
        Self(serde_json::Value::Object(serde_json::Map::new()))
    }
}

/// Who sent the notification.
///
/// Passed through as published. Events without a sender get
/// `{"id": "system", "name": "System"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenderDescriptor(serde_json::Value);

impl SenderDescriptor {
    /// Wraps a producer-supplied JSON value.
    #[must_use]
    pub const fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// The `id` field, when it is a string.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(serde_json::Value::as_str)
    }

    /// The `name` field, when it is a string.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(serde_json::Value::as_str)
    }

    /// The underlying JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl Default for SenderDescriptor {
    fn default() -> Self {
        Self(serde_json::json!({"id": "system", "name": "System"}))
    }
}

/// Canonical notification event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    /// Producer-assigned unique identifier.
    pub message_id: MessageId,
    /// Intended audience.
    pub recipient: RecipientDescriptor,
    /// User-facing content.
    #[serde(default)]
    pub notification: NotificationPayload,
    /// Sender descriptor.
    #[serde(default)]
    pub sender: SenderDescriptor,
    /// Status and timestamps.
    #[serde(flatten)]
    pub state: DeliveryState,
}

impl NotificationEvent {
    /// Returns a copy of this event carrying `state` instead of its own.
    #[must_use]
    pub fn with_state(&self, state: DeliveryState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }
}

/// Payload of a `notification` frame: the canonical event plus the time
/// the frame was composed.
#[derive(Debug, Serialize)]
pub struct OutboundNotification<'a> {
    /// Event with refreshed delivery state.
    #[serde(flatten)]
    pub event: &'a NotificationEvent,
    /// Frame composition time.
    pub timestamp: DateTime<Utc>,
}
