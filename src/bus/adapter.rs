//! Decoding of inbound bus push envelopes.
//!
//! The bus pushes `{"message": {"data": "<base64 JSON>"}}`. Every envelope
//! is acknowledged whatever happens to it: a poison message that keeps
//! failing must not block the topic. Rejections are logged with the reason.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

use crate::dispatch::{DispatchOutcome, EventDispatcher};
use crate::domain::NotificationEvent;

/// Push subscription envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushEnvelope {
    /// The pushed message; absent on malformed pushes.
    #[serde(default)]
    pub message: Option<PushMessage>,
    /// Subscription name, informational.
    #[serde(default)]
    pub subscription: Option<String>,
}

/// Message carried by a [`PushEnvelope`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    /// Base64-encoded JSON [`NotificationEvent`].
    #[serde(default)]
    pub data: Option<String>,
    /// Bus-assigned delivery identifier, informational.
    #[serde(default)]
    pub message_id: Option<String>,
    /// Bus attributes, informational.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// Why an envelope was rejected before reaching the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Request body is not a JSON envelope.
    #[error("malformed envelope: {0}")]
    InvalidEnvelope(String),
    /// Envelope has no `message.data`.
    #[error("missing message.data")]
    MissingPayload,
    /// `message.data` is not valid base64.
    #[error("message.data is not valid base64: {0}")]
    InvalidBase64(String),
    /// Decoded payload is not a JSON object.
    #[error("message.data is not a JSON object: {0}")]
    InvalidJson(String),
    /// Payload has no `messageId`.
    #[error("missing messageId")]
    MissingMessageId,
    /// Payload has no `recipient.type`.
    #[error("missing recipient.type")]
    MissingRecipientType,
    /// Payload has no `recipient.id`.
    #[error("missing recipient.id")]
    MissingRecipientId,
    /// `recipient.type` is not one of `individual`, `group`, `broadcast`.
    #[error("unknown recipient.type: {0}")]
    UnknownRecipientType(String),
    /// Payload is structurally complete but does not match the event shape.
    #[error("invalid notification event: {0}")]
    InvalidEvent(String),
}

/// What the push endpoint reports back to the bus.
///
/// Both variants are acknowledgments; only the response body differs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushAck {
    /// The event was decoded and dispatched.
    Processed(DispatchOutcome),
    /// The envelope was rejected and dropped.
    Rejected(DecodeError),
}

impl PushAck {
    /// Response body sent to the bus.
    #[must_use]
    pub const fn body(&self) -> &'static str {
        match self {
            Self::Processed(_) => "OK",
            Self::Rejected(_) => "ERROR",
        }
    }
}

const RECIPIENT_KINDS: [&str; 3] = ["individual", "group", "broadcast"];

fn non_empty_str<'a>(value: &'a serde_json::Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Turns bus envelopes into [`NotificationEvent`]s and hands them to the
/// dispatcher.
#[derive(Debug, Clone)]
pub struct BusAdapter {
    dispatcher: Arc<EventDispatcher>,
}

impl BusAdapter {
    /// Creates an adapter feeding `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: Arc<EventDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Decodes a raw push request body.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] describing the first structural problem.
    pub fn decode_body(body: &[u8]) -> Result<NotificationEvent, DecodeError> {
        let envelope: PushEnvelope = serde_json::from_slice(body)
            .map_err(|e| DecodeError::InvalidEnvelope(e.to_string()))?;
        Self::decode_envelope(&envelope)
    }

    /// Decodes a parsed envelope.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] describing the first structural problem.
    pub fn decode_envelope(envelope: &PushEnvelope) -> Result<NotificationEvent, DecodeError> {
        let data = envelope
            .message
            .as_ref()
            .and_then(|m| m.data.as_deref())
            .filter(|d| !d.is_empty())
            .ok_or(DecodeError::MissingPayload)?;
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| DecodeError::InvalidBase64(e.to_string()))?;
        Self::decode_payload(&bytes)
    }

    /// Decodes and validates a JSON notification payload.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] describing the first structural problem.
    pub fn decode_payload(bytes: &[u8]) -> Result<NotificationEvent, DecodeError> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
        if !value.is_object() {
            return Err(DecodeError::InvalidJson("expected an object".to_string()));
        }
        if non_empty_str(&value, "/messageId").is_none() {
            return Err(DecodeError::MissingMessageId);
        }
        let Some(kind) = non_empty_str(&value, "/recipient/type") else {
            return Err(DecodeError::MissingRecipientType);
        };
        if !RECIPIENT_KINDS.contains(&kind) {
            return Err(DecodeError::UnknownRecipientType(kind.to_string()));
        }
        if non_empty_str(&value, "/recipient/id").is_none() {
            return Err(DecodeError::MissingRecipientId);
        }
        serde_json::from_value(value).map_err(|e| DecodeError::InvalidEvent(e.to_string()))
    }

    /// Handles one push: decode, dispatch, acknowledge.
    pub async fn handle_push(&self, body: &[u8]) -> PushAck {
        match Self::decode_body(body) {
            Ok(event) => {
                tracing::info!(
                    message_id = %event.message_id,
                    recipient = %event.recipient,
                    "bus message received"
                );
                PushAck::Processed(self.dispatcher.dispatch(&event).await)
            }
            Err(e) => {
                tracing::warn!(reason = %e, "rejected bus message; acknowledging without processing");
                PushAck::Rejected(e)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::dispatch::RecipientResolver;
    use crate::domain::channel::testing::open_channel;
    use crate::domain::{ChannelRegistry, RecipientDescriptor, UserId};
    use crate::persistence::{InMemoryStore, NotificationStore};

    fn envelope_for(payload: &serde_json::Value) -> Vec<u8> {
        let data = STANDARD.encode(payload.to_string());
        serde_json::json!({"message": {"data": data}}).to_string().into_bytes()
    }

    #[test]
    fn decodes_valid_envelope() {
        let body = envelope_for(&serde_json::json!({
            "messageId": "m1",
            "recipient": {"type": "individual", "id": "userA"},
            "notification": {"title": "x"}
        }));
        let Ok(event) = BusAdapter::decode_body(&body) else {
            panic!("valid envelope rejected");
        };
        assert_eq!(event.message_id.as_str(), "m1");
        assert_eq!(
            event.recipient,
            RecipientDescriptor::Individual(UserId::from("userA"))
        );
    }

    #[test]
    fn accepts_free_form_sender_and_payload() {
        let body = envelope_for(&serde_json::json!({
            "messageId": "m2",
            "recipient": {"type": "group", "id": "zone_1"},
            "notification": {"title": "Update", "priority": 1, "meta": {"n": 2}},
            "sender": {"name": "Ana"}
        }));
        let Ok(event) = BusAdapter::decode_body(&body) else {
            panic!("sender without id rejected");
        };
        assert_eq!(event.sender.id(), None);
        assert_eq!(event.sender.name(), Some("Ana"));
        assert_eq!(event.notification.get("priority"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn extra_sender_fields_reach_the_client_frame() {
        let body = envelope_for(&serde_json::json!({
            "messageId": "m3",
            "recipient": {"type": "individual", "id": "u"},
            "sender": {"id": "s", "name": "S", "avatar": "/a.png"}
        }));
        let Ok(event) = BusAdapter::decode_body(&body) else {
            panic!("valid envelope rejected");
        };
        let Ok(frame) = crate::domain::SseFrame::notification(&event, chrono::Utc::now()) else {
            panic!("serialization failed");
        };
        let data: serde_json::Value = serde_json::from_str(frame.data()).unwrap_or_default();
        assert_eq!(
            data["sender"],
            serde_json::json!({"id": "s", "name": "S", "avatar": "/a.png"})
        );
    }

    #[test]
    fn rejects_structural_problems() {
        let cases: Vec<(Vec<u8>, DecodeError)> = vec![
            (b"not json".to_vec(), DecodeError::InvalidEnvelope(String::new())),
            (b"{}".to_vec(), DecodeError::MissingPayload),
            (
                br#"{"message":{"data":"***"}}"#.to_vec(),
                DecodeError::InvalidBase64(String::new()),
            ),
            (
                serde_json::json!({"message": {"data": STANDARD.encode("nope")}})
                    .to_string()
                    .into_bytes(),
                DecodeError::InvalidJson(String::new()),
            ),
            (
                envelope_for(&serde_json::json!({"recipient": {"type": "individual", "id": "u"}})),
                DecodeError::MissingMessageId,
            ),
            (
                envelope_for(&serde_json::json!({"messageId": "m", "recipient": {"id": "u"}})),
                DecodeError::MissingRecipientType,
            ),
            (
                envelope_for(&serde_json::json!({"messageId": "m", "recipient": {"type": "group"}})),
                DecodeError::MissingRecipientId,
            ),
            (
                envelope_for(
                    &serde_json::json!({"messageId": "m", "recipient": {"type": "team", "id": "t"}}),
                ),
                DecodeError::UnknownRecipientType(String::new()),
            ),
            (
                envelope_for(&serde_json::json!({
                    "messageId": "m",
                    "recipient": {"type": "group", "id": "g"},
                    "status": "lost"
                })),
                DecodeError::InvalidEvent(String::new()),
            ),
        ];

        for (body, expected) in cases {
            let Err(err) = BusAdapter::decode_body(&body) else {
                panic!("expected rejection: {expected}");
            };
            assert_eq!(
                std::mem::discriminant(&err),
                std::mem::discriminant(&expected),
                "got {err}, expected {expected}"
            );
        }
    }

    #[tokio::test]
    async fn handle_push_dispatches_or_rejects() {
        let registry = Arc::new(ChannelRegistry::new());
        let store = Arc::new(InMemoryStore::new());
        let dispatcher = Arc::new(EventDispatcher::new(
            RecipientResolver::new(Arc::clone(&registry)),
            Arc::clone(&store) as Arc<dyn NotificationStore>,
        ));
        let adapter = BusAdapter::new(dispatcher);
        let (channel, mut rx) = open_channel(4);
        registry.register_individual(&UserId::from("userA"), channel);

        let ack = adapter
            .handle_push(&envelope_for(&serde_json::json!({
                "messageId": "m1",
                "recipient": {"type": "individual", "id": "userA"}
            })))
            .await;
        assert_eq!(ack, PushAck::Processed(DispatchOutcome { attempted: 1, sent: 1 }));
        assert_eq!(ack.body(), "OK");
        assert!(rx.recv().await.is_some());

        let rejected = adapter.handle_push(b"{\"message\":{}}").await;
        assert_eq!(rejected, PushAck::Rejected(DecodeError::MissingPayload));
        assert_eq!(rejected.body(), "ERROR");
        assert_eq!(store.delivered_calls(), 1);
    }
}
