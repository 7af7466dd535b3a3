//! Recipient descriptors: who an event is addressed to.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{GroupId, UserId};

/// Identifier emitted on the wire for [`RecipientDescriptor::Broadcast`].
pub const BROADCAST_WIRE_ID: &str = "all";

/// Intended audience of a notification.
///
/// On the wire this is the flat object `{"type": "individual" | "group" |
/// "broadcast", "id": "..."}`. The `id` of a broadcast descriptor carries
/// no meaning and is normalized to [`BROADCAST_WIRE_ID`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RecipientWire", into = "RecipientWire")]
pub enum RecipientDescriptor {
    /// A single user, on every device it is connected from.
    Individual(UserId),
    /// Every connection registered under the group.
    Group(GroupId),
    /// Every live connection.
    Broadcast,
}

impl RecipientDescriptor {
    /// Returns the wire discriminator (`individual`, `group`, `broadcast`).
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Individual(_) => "individual",
            Self::Group(_) => "group",
            Self::Broadcast => "broadcast",
        }
    }

    /// Returns the wire identifier.
    #[must_use]
    pub fn id_str(&self) -> &str {
        match self {
            Self::Individual(id) => id.as_str(),
            Self::Group(id) => id.as_str(),
            Self::Broadcast => BROADCAST_WIRE_ID,
        }
    }
}

impl fmt::Display for RecipientDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id_str())
    }
}

/// Flat wire representation of a [`RecipientDescriptor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientWire {
    /// Discriminator string.
    #[serde(rename = "type")]
    pub kind: String,
    /// Recipient identifier.
    pub id: String,
}

impl TryFrom<RecipientWire> for RecipientDescriptor {
    type Error = String;

    fn try_from(wire: RecipientWire) -> Result<Self, Self::Error> {
        if wire.id.trim().is_empty() {
            return Err("recipient.id must not be empty".to_string());
        }
        match wire.kind.as_str() {
            "individual" => Ok(Self::Individual(UserId::new(wire.id))),
            "group" => Ok(Self::Group(GroupId::new(wire.id))),
            "broadcast" => Ok(Self::Broadcast),
            other => Err(format!("unknown recipient type: {other}")),
        }
    }
}

impl From<RecipientDescriptor> for RecipientWire {
    fn from(descriptor: RecipientDescriptor) -> Self {
        Self {
            kind: descriptor.kind().to_string(),
            id: descriptor.id_str().to_string(),
        }
    }
}
