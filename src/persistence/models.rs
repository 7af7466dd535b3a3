//! Database row model for the `notifications` table.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::recipient::RecipientWire;
use crate::domain::{
    DeliveryState, DeliveryStatus, MessageId, NotificationEvent, NotificationPayload,
    RecipientDescriptor, SenderDescriptor,
};
use crate::error::BroadcasterError;

/// Column list shared by every `SELECT` on `notifications`.
pub const NOTIFICATION_COLUMNS: &str = "message_id, recipient_type, recipient_id, notification, \
     sender, status, created_at, delivered_at, read_at";

/// Raw tuple as fetched with [`NOTIFICATION_COLUMNS`].
pub type NotificationTuple = (
    String,
    String,
    String,
    Value,
    Value,
    String,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
);

/// A stored row from the `notifications` table.
#[derive(Debug, Clone)]
pub struct NotificationRow {
    /// Primary key, the producer-assigned message ID.
    pub message_id: String,
    /// `individual`, `group` or `broadcast`.
    pub recipient_type: String,
    /// Recipient identifier.
    pub recipient_id: String,
    /// JSONB notification content.
    pub notification: Value,
    /// JSONB sender descriptor.
    pub sender: Value,
    /// `pending`, `delivered` or `read`.
    pub status: String,
    /// Producer creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// First delivery time.
    pub delivered_at: Option<DateTime<Utc>>,
    /// Read time.
    pub read_at: Option<DateTime<Utc>>,
}

impl From<NotificationTuple> for NotificationRow {
    fn from(
        (
            message_id,
            recipient_type,
            recipient_id,
            notification,
            sender,
            status,
            created_at,
            delivered_at,
            read_at,
        ): NotificationTuple,
    ) -> Self {
        Self {
            message_id,
            recipient_type,
            recipient_id,
            notification,
            sender,
            status,
            created_at,
            delivered_at,
            read_at,
        }
    }
}

impl TryFrom<NotificationRow> for NotificationEvent {
    type Error = BroadcasterError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, detail: String| {
            BroadcasterError::Storage(format!(
                "corrupt {what} in notification {}: {detail}",
                row.message_id
            ))
        };

        let recipient = RecipientDescriptor::try_from(RecipientWire {
            kind: row.recipient_type.clone(),
            id: row.recipient_id.clone(),
        })
        .map_err(|e| corrupt("recipient", e))?;
        let status: DeliveryStatus = row.status.parse().map_err(|e| corrupt("status", e))?;
        let notification = NotificationPayload::new(row.notification);
        let sender = if row.sender.is_null() {
            SenderDescriptor::default()
        } else {
            SenderDescriptor::new(row.sender)
        };

        Ok(Self {
            message_id: MessageId::new(row.message_id),
            recipient,
            notification,
            sender,
            state: DeliveryState {
                status,
                created_at: row.created_at,
                delivered_at: row.delivered_at,
                read_at: row.read_at,
            },
        })
    }
}
