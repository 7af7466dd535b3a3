//! Event stream behind a streaming connection's SSE response.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::response::sse::Event;
use futures_util::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFutureOwned};

use crate::domain::SseFrame;

/// Stream of events for one session, wrapped in axum's `Sse` response.
///
/// Yields buffered frames in order. Ends once the session has closed and
/// the buffer is drained. Dropping it (the transport going away) cancels
/// the session, which triggers its teardown.
pub struct SessionStream {
    frames: mpsc::Receiver<SseFrame>,
    closed: Pin<Box<WaitForCancellationFutureOwned>>,
    _disconnect: DropGuard,
}

impl SessionStream {
    pub(crate) fn new(frames: mpsc::Receiver<SseFrame>, cancel: CancellationToken) -> Self {
        Self {
            frames,
            closed: Box::pin(cancel.clone().cancelled_owned()),
            _disconnect: cancel.drop_guard(),
        }
    }
}

impl Stream for SessionStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Poll::Ready(frame) = self.frames.poll_recv(cx) {
            return Poll::Ready(frame.map(|frame| Ok(frame.into_event())));
        }
        if self.closed.as_mut().poll(cx).is_ready() {
            return Poll::Ready(None);
        }
        Poll::Pending
    }
}

impl fmt::Debug for SessionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStream").finish_non_exhaustive()
    }
}
