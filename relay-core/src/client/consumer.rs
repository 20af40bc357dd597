//! Cancellable consumer of a relayed event stream

use crate::error::ClientError;
use crate::protocol::{ConversationResponse, DecodeStats, FrameDecoder};
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Position of a consumer in its single pass over the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Waiting for the next chunk from the source
    AwaitingFrame,
    /// Decoded messages are queued for delivery
    Decoded,
    /// The source closed gracefully
    Done,
    /// The caller cancelled
    Cancelled,
    /// Reading the source failed
    Failed,
}

impl ConsumerState {
    /// Whether the consumer will yield nothing further
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConsumerState::Done | ConsumerState::Cancelled | ConsumerState::Failed
        )
    }
}

/// Lazy, forward-only sequence of messages decoded from a byte source
///
/// The source is released exactly once, on whichever exit comes first:
/// graceful end, read error or cancellation. A released source is never
/// polled again.
pub struct StreamConsumer<S> {
    source: Option<S>,
    decoder: FrameDecoder,
    queued: VecDeque<ConversationResponse>,
    cancel: CancellationToken,
    state: ConsumerState,
}

impl<S> fmt::Debug for StreamConsumer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConsumer")
            .field("state", &self.state)
            .field("queued", &self.queued.len())
            .field("released", &self.source.is_none())
            .finish()
    }
}

impl<S, E> StreamConsumer<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: fmt::Display,
{
    pub fn new(source: S, cancel: CancellationToken) -> Self {
        Self {
            source: Some(source),
            decoder: FrameDecoder::new(),
            queued: VecDeque::new(),
            cancel,
            state: ConsumerState::AwaitingFrame,
        }
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// Whether the source has been released
    pub fn is_released(&self) -> bool {
        self.source.is_none()
    }

    pub fn decode_stats(&self) -> DecodeStats {
        self.decoder.stats()
    }

    /// Token observed before every read
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next message of the stream
    ///
    /// Returns `None` once the stream has ended. Cancellation is reported as
    /// [`ClientError::Cancelled`] once, then the stream ends.
    pub async fn next_message(&mut self) -> Option<Result<ConversationResponse, ClientError>> {
        loop {
            if self.state.is_terminal() {
                return None;
            }

            if self.cancel.is_cancelled() {
                return Some(Err(self.cancelled()));
            }

            if let Some(message) = self.queued.pop_front() {
                if self.queued.is_empty() {
                    self.state = ConsumerState::AwaitingFrame;
                }
                return Some(Ok(message));
            }

            let Some(source) = self.source.as_mut() else {
                self.state = ConsumerState::Done;
                return None;
            };

            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                item = source.next() => Some(item),
            };

            match read {
                None => return Some(Err(self.cancelled())),
                Some(Some(Ok(chunk))) => {
                    self.queued.extend(self.decoder.decode(&chunk));
                    if !self.queued.is_empty() {
                        self.state = ConsumerState::Decoded;
                    }
                }
                Some(Some(Err(e))) => {
                    self.release(ConsumerState::Failed);
                    return Some(Err(ClientError::Transport(e.to_string())));
                }
                Some(None) => {
                    self.decoder.finish();
                    self.release(ConsumerState::Done);
                    return None;
                }
            }
        }
    }

    /// Convert into a `Stream` of messages
    pub fn into_stream(self) -> impl Stream<Item = Result<ConversationResponse, ClientError>> {
        stream::unfold(self, |mut consumer| async move {
            consumer
                .next_message()
                .await
                .map(|item| (item, consumer))
        })
    }

    fn cancelled(&mut self) -> ClientError {
        debug!(
            "Conversation stream cancelled with {} queued messages",
            self.queued.len()
        );
        self.queued.clear();
        self.release(ConsumerState::Cancelled);
        ClientError::Cancelled
    }

    fn release(&mut self, state: ConsumerState) {
        self.source = None;
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};

    type Chunk = Result<Bytes, String>;

    /// Source that counts how often it is dropped
    struct Counted<S> {
        inner: S,
        drops: Arc<AtomicUsize>,
    }

    impl<S: Stream + Unpin> Stream for Counted<S> {
        type Item = S::Item;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
            self.inner.poll_next_unpin(cx)
        }
    }

    impl<S> Drop for Counted<S> {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counted<S>(inner: S) -> (Counted<S>, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        (
            Counted {
                inner,
                drops: drops.clone(),
            },
            drops,
        )
    }

    fn frame(thread_id: &str) -> Chunk {
        Ok(Bytes::from(format!(
            "event:message\ndata:{{\"status\":0,\"data\":{{\"message\":{{\"threadId\":\"{}\",\"content\":[]}}}}}}\n\n",
            thread_id
        )))
    }

    #[tokio::test]
    async fn test_yields_messages_in_order() {
        let (source, drops) = counted(stream::iter(vec![frame("t1"), frame("t2"), frame("t3")]));
        let mut consumer = StreamConsumer::new(source, CancellationToken::new());

        let mut threads = Vec::new();
        while let Some(item) = consumer.next_message().await {
            let response = item.unwrap();
            threads.push(response.agent_message().unwrap().thread_id.clone());
        }

        assert_eq!(threads, vec!["t1", "t2", "t3"]);
        assert_eq!(consumer.state(), ConsumerState::Done);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(consumer.next_message().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_before_first_frame() {
        let (source, drops) = counted(stream::iter(vec![frame("t1")]));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut consumer = StreamConsumer::new(source, cancel);

        let outcome = consumer.next_message().await.unwrap();
        assert!(outcome.unwrap_err().is_cancelled());
        assert!(consumer.next_message().await.is_none());
        assert_eq!(consumer.state(), ConsumerState::Cancelled);

        drop(consumer);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_after_n_messages() {
        // Both frames arrive in one chunk, so the second is queued at cancel time
        let joined = {
            let mut bytes = Vec::new();
            bytes.extend_from_slice(&frame("t1").unwrap());
            bytes.extend_from_slice(&frame("t2").unwrap());
            Ok(Bytes::from(bytes))
        };
        let (source, drops) = counted(stream::iter(vec![joined, frame("t3")]));
        let cancel = CancellationToken::new();
        let mut consumer = StreamConsumer::new(source, cancel.clone());

        let first = consumer.next_message().await.unwrap().unwrap();
        assert_eq!(first.agent_message().unwrap().thread_id, "t1");

        cancel.cancel();
        assert!(consumer.next_message().await.unwrap().unwrap_err().is_cancelled());
        assert!(consumer.next_message().await.is_none());
        assert!(consumer.is_released());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_while_read_pending() {
        let (source, drops) = counted(stream::pending::<Chunk>());
        let cancel = CancellationToken::new();
        let mut consumer = StreamConsumer::new(source, cancel.clone());

        let trigger = tokio::spawn(async move {
            tokio::task::yield_now().await;
            cancel.cancel();
        });

        let outcome = consumer.next_message().await.unwrap();
        assert!(outcome.unwrap_err().is_cancelled());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        trigger.await.unwrap();
    }

    #[tokio::test]
    async fn test_read_error_fails_once() {
        let (source, drops) = counted(stream::iter(vec![
            frame("t1"),
            Err("connection reset".to_string()),
            frame("t2"),
        ]));
        let mut consumer = StreamConsumer::new(source, CancellationToken::new());

        assert!(consumer.next_message().await.unwrap().is_ok());
        match consumer.next_message().await {
            Some(Err(ClientError::Transport(message))) => {
                assert_eq!(message, "connection reset")
            }
            other => panic!("expected transport error, got {:?}", other),
        }
        assert!(consumer.next_message().await.is_none());
        assert_eq!(consumer.state(), ConsumerState::Failed);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_trailing_bytes_are_dropped() {
        let unterminated = Ok(Bytes::from_static(
            b"event:message\ndata:{\"status\":0,\"data\":{\"message\":{\"threadId\":\"late\"}}}",
        ));
        let (source, _) = counted(stream::iter(vec![frame("t1"), unterminated]));
        let consumer = StreamConsumer::new(source, CancellationToken::new());

        let messages: Vec<_> = consumer.into_stream().collect().await;
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn test_into_stream_ends_after_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let consumer = StreamConsumer::new(stream::iter(vec![frame("t1")]), cancel);

        let items: Vec<_> = consumer.into_stream().collect().await;
        assert_eq!(items.len(), 1);
        assert!(items[0].as_ref().unwrap_err().is_cancelled());
    }
}
