//! Persistence layer: the durable notification store collaborator.
//!
//! The fan-out engine only needs to read authoritative delivery state and
//! request status transitions. [`NotificationStore`] captures exactly that
//! surface plus the reconciliation query clients run on connect. The
//! concrete implementations are [`postgres::PostgresStore`] and
//! [`memory::InMemoryStore`].

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{DeliveryStatus, MessageId, NotificationEvent, UserId};
use crate::error::BroadcasterError;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Durable store of notification documents.
///
/// Status transitions are idempotent and monotonic: a document never moves
/// back from `read` to `delivered` or from `delivered` to `pending`.
#[async_trait]
pub trait NotificationStore: Send + Sync + std::fmt::Debug {
    /// Loads the stored document, including its authoritative state.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcasterError::Storage`] on backend failure.
    async fn find(&self, message_id: &MessageId)
    -> Result<Option<NotificationEvent>, BroadcasterError>;

    /// Transitions a `pending` document to `delivered`, stamping
    /// `deliveredAt`. Returns whether the document changed.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcasterError::Storage`] on backend failure.
    async fn mark_delivered(&self, message_id: &MessageId) -> Result<bool, BroadcasterError>;

    /// Transitions a document to `read`, stamping `readAt`. Returns whether
    /// the document changed.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcasterError::Storage`] on backend failure.
    async fn mark_read(&self, message_id: &MessageId) -> Result<bool, BroadcasterError>;

    /// Lists a user's individually addressed documents with the given
    /// status, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcasterError::Storage`] on backend failure.
    async fn list_for_user(
        &self,
        user_id: &UserId,
        status: DeliveryStatus,
    ) -> Result<Vec<NotificationEvent>, BroadcasterError>;

    /// Verifies the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcasterError::Storage`] if it is not.
    async fn ping(&self) -> Result<(), BroadcasterError>;
}
