//! One client's streaming connection.
//!
//! A [`ConnectionSession`] owns its [`Channel`], registers it under the
//! user and every group membership, sends the `connected` acknowledgment,
//! and runs a heartbeat task. It is torn down exactly once, by whichever
//! comes first:
//!
//! - the client going away (the [`SessionStream`] body is dropped);
//! - a heartbeat write failing;
//! - an explicit [`ConnectionSession::close`].
//!
//! Teardown cancels the session token first, so any handle still held by
//! a dispatcher snapshot fails its next write, and then removes the
//! channel from every registry map in one step.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::stream::SessionStream;
use crate::config::SessionConfig;
use crate::domain::{Channel, ChannelRegistry, GroupId, SessionId, SseFrame, UserId};
use crate::error::{BroadcasterError, ChannelError};

const OPEN: u8 = 0;
const CLOSING: u8 = 1;
const CLOSED: u8 = 2;

/// Lifecycle of a session. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Registered and streaming.
    Open,
    /// Teardown in progress.
    Closing,
    /// Unregistered everywhere. Terminal.
    Closed,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The client closed the stream or the transport reset.
    ClientDisconnected,
    /// A keep-alive write failed.
    HeartbeatFailed(ChannelError),
    /// The server closed the session.
    Server,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClientDisconnected => f.write_str("client disconnected"),
            Self::HeartbeatFailed(e) => write!(f, "heartbeat failed: {e}"),
            Self::Server => f.write_str("closed by server"),
        }
    }
}

/// A live streaming connection.
#[derive(Debug)]
pub struct ConnectionSession {
    id: SessionId,
    user_id: UserId,
    groups: Vec<GroupId>,
    channel: Channel,
    registry: Arc<ChannelRegistry>,
    cancel: CancellationToken,
    state: AtomicU8,
    close_reason: OnceLock<CloseReason>,
}

impl ConnectionSession {
    /// Opens a session for `user_id` with the given group memberships.
    ///
    /// Registers the channel, enqueues the `connected` acknowledgment and
    /// starts the heartbeat. The returned [`SessionStream`] is the
    /// response body; dropping it closes the session.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcasterError::MissingRecipient`] if `user_id` is blank.
    /// Nothing is registered in that case.
    pub async fn open(
        registry: Arc<ChannelRegistry>,
        user_id: UserId,
        mut groups: Vec<GroupId>,
        config: SessionConfig,
    ) -> Result<(Arc<Self>, SessionStream), BroadcasterError> {
        if user_id.is_blank() {
            return Err(BroadcasterError::MissingRecipient);
        }
        groups.retain(|g| !g.is_blank());
        groups.sort();
        groups.dedup();

        let id = SessionId::new();
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(config.channel_buffer.max(1));
        let channel = Channel::new(id, tx, cancel.clone(), config.write_timeout);

        let session = Arc::new(Self {
            id,
            user_id,
            groups,
            channel,
            registry,
            cancel: cancel.clone(),
            state: AtomicU8::new(OPEN),
            close_reason: OnceLock::new(),
        });
        let stream = SessionStream::new(rx, cancel);

        session
            .registry
            .register_session(&session.user_id, &session.groups, &session.channel);
        tracing::info!(
            user_id = %session.user_id,
            session_id = %session.id,
            groups = ?session.groups,
            "session opened"
        );

        let ack = SseFrame::connected(&session.user_id, Utc::now());
        if let Err(e) = session.channel.write(ack).await {
            session.close(CloseReason::HeartbeatFailed(e));
            return Err(BroadcasterError::Internal(format!(
                "failed to acknowledge stream: {e}"
            )));
        }

        tokio::spawn(Arc::clone(&session).run_heartbeat(config.heartbeat_interval));
        Ok((session, stream))
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// The user this session streams for.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Group memberships registered for this session.
    #[must_use]
    pub fn groups(&self) -> &[GroupId] {
        &self.groups
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        match self.state.load(Ordering::Acquire) {
            OPEN => SessionState::Open,
            CLOSING => SessionState::Closing,
            _ => SessionState::Closed,
        }
    }

    /// Why the session ended, once it has.
    #[must_use]
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason.get().copied()
    }

    /// Writes one keep-alive frame.
    ///
    /// # Errors
    ///
    /// Returns the [`ChannelError`] of the failed write.
    pub async fn heartbeat(&self) -> Result<(), ChannelError> {
        self.channel.write(SseFrame::heartbeat()).await
    }

    /// Tears the session down: cancels the heartbeat and unregisters the
    /// channel from the user and every group.
    ///
    /// Only the first call has any effect; it returns `true`. Later calls,
    /// including ones racing with it, return `false`.
    pub fn close(&self, reason: CloseReason) -> bool {
        if self
            .state
            .compare_exchange(OPEN, CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let _ = self.close_reason.set(reason);
        self.cancel.cancel();
        self.registry
            .unregister_session(&self.user_id, &self.groups, &self.channel);
        self.state.store(CLOSED, Ordering::Release);

        tracing::info!(
            user_id = %self.user_id,
            session_id = %self.id,
            %reason,
            "session closed"
        );
        true
    }

    async fn run_heartbeat(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let reason = loop {
            tokio::select! {
                () = self.cancel.cancelled() => break CloseReason::ClientDisconnected,
                _ = ticker.tick() => {
                    if let Err(e) = self.heartbeat().await {
                        tracing::debug!(session_id = %self.id, error = %e, "heartbeat write failed");
                        break CloseReason::HeartbeatFailed(e);
                    }
                }
            }
        };

        self.close(reason);
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use futures_util::StreamExt;

    use super::*;
    use crate::domain::frame::testing::render;

    fn config(buffer: usize) -> SessionConfig {
        SessionConfig {
            heartbeat_interval: Duration::from_secs(30),
            channel_buffer: buffer,
            write_timeout: Some(Duration::from_secs(1)),
        }
    }

    async fn open(
        registry: &Arc<ChannelRegistry>,
        user: &str,
        groups: &[&str],
        config: SessionConfig,
    ) -> (Arc<ConnectionSession>, SessionStream) {
        let groups = groups.iter().map(|g| GroupId::from(*g)).collect();
        let Ok(opened) =
            ConnectionSession::open(Arc::clone(registry), UserId::from(user), groups, config).await
        else {
            panic!("session open failed");
        };
        opened
    }

    async fn next_text(stream: &mut SessionStream) -> String {
        match stream.next().await {
            Some(Ok(event)) => render(event).await,
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_user_is_rejected_without_registration() {
        let registry = Arc::new(ChannelRegistry::new());
        let result =
            ConnectionSession::open(Arc::clone(&registry), UserId::from("  "), vec![], config(4))
                .await;
        assert!(matches!(result, Err(BroadcasterError::MissingRecipient)));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn open_registers_and_acknowledges() {
        let registry = Arc::new(ChannelRegistry::new());
        let (session, mut stream) = open(&registry, "userA", &["g1", "g2", "g1"], config(4)).await;

        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(session.groups().len(), 2);
        assert_eq!(registry.lookup_individual(&UserId::from("userA")).len(), 1);
        assert_eq!(registry.lookup_group(&GroupId::from("g1")).len(), 1);

        let ack = next_text(&mut stream).await;
        assert!(ack.starts_with("event: connected\ndata: {\"userId\":\"userA\""));
    }

    #[tokio::test]
    async fn dropping_stream_unregisters_everywhere() {
        let registry = Arc::new(ChannelRegistry::new());
        let (session, stream) = open(&registry, "userA", &["g1"], config(4)).await;

        drop(stream);
        for _ in 0..100 {
            if session.state() == SessionState::Closed {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.close_reason(), Some(CloseReason::ClientDisconnected));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn close_runs_exactly_once() {
        let registry = Arc::new(ChannelRegistry::new());
        let (session, _stream) = open(&registry, "userA", &["g1"], config(4)).await;

        let racers: Vec<_> = (0..8)
            .map(|_| {
                let session = Arc::clone(&session);
                tokio::spawn(async move { session.close(CloseReason::Server) })
            })
            .collect();
        let mut winners = 0;
        for racer in racers {
            if matches!(racer.await, Ok(true)) {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert!(!session.close(CloseReason::ClientDisconnected));
        assert_eq!(session.close_reason(), Some(CloseReason::Server));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn heartbeat_after_close_fails() {
        let registry = Arc::new(ChannelRegistry::new());
        let (session, _stream) = open(&registry, "userA", &[], config(4)).await;
        session.close(CloseReason::Server);
        assert_eq!(session.heartbeat().await, Err(ChannelError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeats_arrive_on_interval() {
        let registry = Arc::new(ChannelRegistry::new());
        let (session, mut stream) = open(&registry, "userA", &[], config(8)).await;

        let _ack = next_text(&mut stream).await;
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(next_text(&mut stream).await, "event: heartbeat\ndata: ping\n\n");
        assert_eq!(next_text(&mut stream).await, "event: heartbeat\ndata: ping\n\n");
        assert_eq!(session.state(), SessionState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn third_heartbeat_failure_closes_session() {
        let registry = Arc::new(ChannelRegistry::new());
        // Room for the ack and two heartbeats; the client never reads, so
        // the third heartbeat cannot be enqueued and times out.
        let (session, mut stream) = open(&registry, "userA", &["g1", "g2"], config(3)).await;

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(session.state(), SessionState::Open);

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(
            session.close_reason(),
            Some(CloseReason::HeartbeatFailed(ChannelError::Timeout))
        );
        assert!(registry.is_empty());

        // Buffered frames still drain, then the body ends.
        let _ack = next_text(&mut stream).await;
        assert_eq!(next_text(&mut stream).await, "event: heartbeat\ndata: ping\n\n");
        assert_eq!(next_text(&mut stream).await, "event: heartbeat\ndata: ping\n\n");
        assert!(stream.next().await.is_none());
    }
}
