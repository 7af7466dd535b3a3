//! In-memory notification store.
//!
//! Used when `PERSISTENCE_ENABLED=false` and throughout the test suite.
//! Counts every `mark_delivered` call so callers can assert on storage
//! traffic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::NotificationStore;
use crate::domain::{DeliveryStatus, MessageId, NotificationEvent, RecipientDescriptor, UserId};
use crate::error::BroadcasterError;

/// Process-local [`NotificationStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    documents: RwLock<HashMap<MessageId, NotificationEvent>>,
    delivered_calls: AtomicUsize,
    find_calls: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a document.
    pub fn insert(&self, event: NotificationEvent) {
        self.documents
            .write()
            .insert(event.message_id.clone(), event);
    }

    /// Returns a copy of the stored document, bypassing call counters.
    #[must_use]
    pub fn get(&self, message_id: &MessageId) -> Option<NotificationEvent> {
        self.documents.read().get(message_id).cloned()
    }

    /// Number of `mark_delivered` calls received so far.
    #[must_use]
    pub fn delivered_calls(&self) -> usize {
        self.delivered_calls.load(Ordering::SeqCst)
    }

    /// Number of `find` calls received so far.
    #[must_use]
    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    /// Makes every subsequent call fail with a storage error (or succeed
    /// again when `false`).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), BroadcasterError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BroadcasterError::Storage("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn find(
        &self,
        message_id: &MessageId,
    ) -> Result<Option<NotificationEvent>, BroadcasterError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.get(message_id))
    }

    async fn mark_delivered(&self, message_id: &MessageId) -> Result<bool, BroadcasterError> {
        self.delivered_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let mut documents = self.documents.write();
        let Some(doc) = documents.get_mut(message_id) else {
            return Ok(false);
        };
        if doc.state.status != DeliveryStatus::Pending {
            return Ok(false);
        }
        doc.state.status = DeliveryStatus::Delivered;
        doc.state.delivered_at = Some(Utc::now());
        Ok(true)
    }

    async fn mark_read(&self, message_id: &MessageId) -> Result<bool, BroadcasterError> {
        self.check()?;
        let mut documents = self.documents.write();
        let Some(doc) = documents.get_mut(message_id) else {
            return Ok(false);
        };
        if doc.state.status == DeliveryStatus::Read {
            return Ok(false);
        }
        doc.state.status = DeliveryStatus::Read;
        doc.state.read_at = Some(Utc::now());
        Ok(true)
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        status: DeliveryStatus,
    ) -> Result<Vec<NotificationEvent>, BroadcasterError> {
        self.check()?;
        let mut matching: Vec<NotificationEvent> = self
            .documents
            .read()
            .values()
            .filter(|doc| doc.state.status == status)
            .filter(|doc| matches!(&doc.recipient, RecipientDescriptor::Individual(id) if id == user_id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.state.created_at.cmp(&a.state.created_at));
        Ok(matching)
    }

    async fn ping(&self) -> Result<(), BroadcasterError> {
        self.check()
    }
}
