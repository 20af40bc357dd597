//! Byte relay between the agent stream and the downstream connection
//!
//! [`RelayStream`] wraps the upstream body and is handed to the HTTP server as
//! the response body. It never looks inside the bytes, so any event schema
//! passes through unchanged.
//!
//! Lifecycle coupling:
//! - upstream error: the stream ends at once, nothing after the error is read
//! - upstream end: the stream ends after the last chunk
//! - downstream disconnect: the server drops the body, which drops the
//!   upstream connection
//! - session cancellation: the upstream is dropped on the next poll, even
//!   while a read is pending
//!
//! The upstream is only polled when the downstream asks for the next chunk,
//! so a slow client slows the upstream read instead of filling memory.

mod session;

pub use session::{SessionOutcome, StreamSession};

use crate::error::RelayResult;
use crate::protocol::AgentRoute;
use crate::upstream::{ByteStream, UpstreamStream};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::WaitForCancellationFutureOwned;
use tracing::{debug, error};

/// Verbatim relay of an upstream byte stream
pub struct RelayStream<S> {
    /// Dropped as soon as the session ends
    upstream: Option<S>,
    session: StreamSession,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl RelayStream<ByteStream> {
    /// Start relaying an upstream response
    pub fn from_upstream(upstream: UpstreamStream, route: AgentRoute) -> Self {
        let session = StreamSession::new(upstream.request_id, route);
        Self::new(upstream.body, session)
    }
}

impl<S> RelayStream<S> {
    pub fn new(upstream: S, session: StreamSession) -> Self {
        let cancelled = Box::pin(session.cancellation_token().cancelled_owned());
        Self {
            upstream: Some(upstream),
            session,
            cancelled,
        }
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    /// Whether the upstream connection is still held
    pub fn is_upstream_open(&self) -> bool {
        self.upstream.is_some()
    }

    fn release(&mut self, outcome: SessionOutcome) {
        self.upstream = None;
        self.session.finish(outcome);
    }
}

impl<S> Stream for RelayStream<S>
where
    S: Stream<Item = RelayResult<Bytes>> + Unpin,
{
    type Item = RelayResult<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        let Some(upstream) = this.upstream.as_mut() else {
            return Poll::Ready(None);
        };

        // 1. Check cancellation; registers the waker while a read is pending
        if this.cancelled.as_mut().poll(cx).is_ready() {
            debug!("Relay session {} cancelled", this.session.id());
            this.release(SessionOutcome::Cancelled);
            return Poll::Ready(None);
        }

        // 2. Pull exactly one chunk from upstream
        match upstream.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.session.record_chunk(chunk.len());
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                error!("Stream error [request_id: {}]: {}", this.session.id(), e);
                this.release(SessionOutcome::UpstreamFailed);
                Poll::Ready(None)
            }
            Poll::Ready(None) => {
                this.release(SessionOutcome::Completed);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.upstream {
            Some(upstream) => (0, upstream.size_hint().1),
            None => (0, Some(0)),
        }
    }
}

impl<S> Drop for RelayStream<S> {
    fn drop(&mut self) {
        if self.upstream.is_some() {
            self.release(SessionOutcome::Disconnected);
        }
    }
}
