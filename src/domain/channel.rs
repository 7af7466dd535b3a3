//! Write handle to one session's output stream.
//!
//! A [`Channel`] is a cheap, cloneable handle. The registry and the
//! dispatcher hold clones; the owning session holds the receiving end and
//! the cancellation token. A handle outliving its session stays safe to
//! use: every write against it fails with [`ChannelError::Closed`].

use std::hash::{Hash, Hasher};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{SessionId, SseFrame};
use crate::error::ChannelError;

/// Ordered, writable event sink bound to exactly one session.
///
/// Equality and hashing use the session identity only, so two handles to
/// the same session are the same channel.
#[derive(Debug, Clone)]
pub struct Channel {
    session_id: SessionId,
    sender: mpsc::Sender<SseFrame>,
    closed: CancellationToken,
    write_timeout: Option<Duration>,
}

impl Channel {
    pub(crate) fn new(
        session_id: SessionId,
        sender: mpsc::Sender<SseFrame>,
        closed: CancellationToken,
        write_timeout: Option<Duration>,
    ) -> Self {
        Self {
            session_id,
            sender,
            closed,
            write_timeout,
        }
    }

    /// Identity of the owning session.
    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Returns `true` once the owning session is closing or its stream is gone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.sender.is_closed()
    }

    /// Enqueues one complete frame.
    ///
    /// Waits for buffer space when the client is slow, but gives up as
    /// soon as the session closes or the write timeout elapses.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] if the session is closing or closed,
    /// and [`ChannelError::Timeout`] if the frame could not be enqueued in
    /// time.
    pub async fn write(&self, frame: SseFrame) -> Result<(), ChannelError> {
        if self.closed.is_cancelled() {
            return Err(ChannelError::Closed);
        }

        let send = async {
            tokio::select! {
                biased;
                () = self.closed.cancelled() => Err(ChannelError::Closed),
                sent = self.sender.send(frame) => sent.map_err(|_| ChannelError::Closed),
            }
        };

        match self.write_timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .unwrap_or(Err(ChannelError::Timeout)),
            None => send.await,
        }
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.session_id == other.session_id
    }
}

impl Eq for Channel {}

impl Hash for Channel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.session_id.hash(state);
    }
}
