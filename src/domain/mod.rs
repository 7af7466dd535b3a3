//! Domain layer: identifiers, notification model, wire framing, channels,
//! and the channel registry.
//!
//! Everything here is transport-agnostic. The registry is the only state
//! shared between the dispatcher and the sessions.

pub mod channel;
pub mod channel_registry;
pub mod frame;
pub mod ids;
pub mod notification;
pub mod recipient;

pub use channel::Channel;
pub use channel_registry::{ChannelRegistry, ConnectionCounts};
pub use frame::SseFrame;
pub use ids::{GroupId, MessageId, SessionId, UserId};
pub use notification::{
    DeliveryState, DeliveryStatus, NotificationEvent, NotificationPayload, SenderDescriptor,
};
pub use recipient::RecipientDescriptor;
