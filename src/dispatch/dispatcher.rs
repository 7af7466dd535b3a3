//! Fan-out of one notification event to every resolved channel.
//!
//! For each event the dispatcher:
//!
//! 1. resolves the target channels (a snapshot of the registry);
//! 2. returns early, touching no storage, when nobody is connected;
//! 3. re-reads the authoritative delivery state from the store, so a
//!    redelivered or stale bus payload never shows an older status;
//! 4. writes one frame to every channel concurrently, isolating failures;
//! 5. asks the store to mark the event delivered if any write succeeded.
//!
//! Dead channels are only counted here. Reclaiming them is the owning
//! session's job.

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use serde::Serialize;
use utoipa::ToSchema;

use super::RecipientResolver;
use crate::domain::{DeliveryState, NotificationEvent, SseFrame};
use crate::persistence::NotificationStore;

/// Result of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DispatchOutcome {
    /// Channels the event was resolved to.
    pub attempted: usize,
    /// Channels that accepted the frame.
    pub sent: usize,
}

impl DispatchOutcome {
    /// Channels whose write failed.
    #[must_use]
    pub const fn failed(&self) -> usize {
        self.attempted.saturating_sub(self.sent)
    }
}

/// Routes decoded events to live channels and reports delivery.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    resolver: RecipientResolver,
    store: Arc<dyn NotificationStore>,
}

impl EventDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(resolver: RecipientResolver, store: Arc<dyn NotificationStore>) -> Self {
        Self { resolver, store }
    }

    /// Delivers `event` to every channel its recipient resolves to.
    ///
    /// Never fails: write failures and storage failures are logged and
    /// reflected in the returned counts only.
    pub async fn dispatch(&self, event: &NotificationEvent) -> DispatchOutcome {
        let message_id = &event.message_id;
        let targets = self.resolver.resolve(&event.recipient);

        if targets.is_empty() {
            tracing::info!(
                %message_id,
                recipient = %event.recipient,
                "no live channels; notification stays pending"
            );
            return DispatchOutcome::default();
        }

        let fresh = event.with_state(self.authoritative_state(event).await);
        let frame = match SseFrame::notification(&fresh, Utc::now()) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(%message_id, error = %e, "failed to encode notification frame");
                return DispatchOutcome {
                    attempted: targets.len(),
                    sent: 0,
                };
            }
        };

        let writes = targets.iter().map(|channel| {
            let frame = frame.clone();
            async move { (channel.session_id(), channel.write(frame).await) }
        });

        let mut sent = 0_usize;
        for (session_id, result) in join_all(writes).await {
            match result {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::warn!(%message_id, %session_id, error = %e, "channel write failed");
                }
            }
        }

        let outcome = DispatchOutcome {
            attempted: targets.len(),
            sent,
        };
        tracing::info!(
            %message_id,
            recipient = %event.recipient,
            attempted = outcome.attempted,
            sent = outcome.sent,
            "notification dispatched"
        );

        if sent > 0 {
            match self.store.mark_delivered(message_id).await {
                Ok(changed) => tracing::debug!(%message_id, changed, "marked delivered"),
                Err(e) => {
                    tracing::error!(%message_id, error = %e, "failed to mark notification delivered");
                }
            }
        }

        outcome
    }

    /// Reads the stored status and timestamps, falling back to the state
    /// carried by the bus payload when the store has no document or fails.
    async fn authoritative_state(&self, event: &NotificationEvent) -> DeliveryState {
        let message_id = &event.message_id;
        match self.store.find(message_id).await {
            Ok(Some(stored)) => stored.state,
            Ok(None) => {
                tracing::warn!(%message_id, "notification not in store; using bus payload state");
                event.state.clone()
            }
            Err(e) => {
                tracing::warn!(%message_id, error = %e, "store read failed; using bus payload state");
                event.state.clone()
            }
        }
    }
}
