//! A record stream that can be aborted and always cleans up exactly once.
//!
//! [`AbortableStream`] sits at the end of the streaming pipeline:
//!
//! ```text
//! bytes ──▶ lines ──▶ records ──▶ AbortableStream ──▶ caller
//!   ▲                                   │
//!   └────────── CancellationToken ◀─────┘ abort()
//! ```
//!
//! It ends in one of four ways:
//!
//! | State        | Trigger                               | Caller sees                     |
//! |--------------|---------------------------------------|---------------------------------|
//! | `Completed`  | a terminal record was yielded         | the record, then `None`         |
//! | `Errored`    | an error record or transport error    | `Err(..)`, then `None`          |
//! | `Aborted`    | [`AbortableStream::abort`] or drop    | `None`                          |
//! | `Incomplete` | body closed without a terminal record | `Err(IncompleteStream)`, `None` |
//!
//! The cleanup callback runs exactly once on whichever comes first, including
//! when the stream is dropped while still running.

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use futures::stream::FusedStream;
use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, Result};
use crate::lines::lines;
use crate::records::{StreamFrame, StreamRecord, records};

type FrameStream<T> = Pin<Box<dyn Stream<Item = Result<StreamFrame<T>>> + Send>>;

/// Lifecycle of an [`AbortableStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Still yielding records.
    Running,
    /// A terminal record was yielded.
    Completed,
    /// An error record or transport error was yielded.
    Errored,
    /// Cancelled by the caller.
    Aborted,
    /// The body ended without a terminal record.
    Incomplete,
}

/// Runs a callback at most once, from whichever side gets there first.
#[derive(Clone)]
struct Cleanup(Arc<Mutex<Option<Box<dyn FnOnce() + Send>>>>);

impl Cleanup {
    fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(Some(Box::new(f)))))
    }

    fn run(&self) {
        let f = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(f) = f {
            f();
        }
    }
}

/// Cloneable handle that aborts one stream from anywhere.
#[derive(Clone)]
pub struct AbortHandle {
    token: CancellationToken,
    cleanup: Cleanup,
}

impl AbortHandle {
    /// Signal cancellation and run cleanup. Repeated calls are no-ops.
    pub fn abort(&self) {
        self.token.cancel();
        self.cleanup.run();
    }

    /// Whether the stream's cancellation token has fired.
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl std::fmt::Debug for AbortHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbortHandle")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

/// A stream of `T` records with cooperative cancellation.
///
/// Yields `Ok(record)` until a terminal record, an error, or an abort. Abort
/// is not an error: the stream just ends.
pub struct AbortableStream<T> {
    inner: Option<FrameStream<T>>,
    handle: AbortHandle,
    state: StreamState,
}

impl<T: StreamRecord> AbortableStream<T> {
    /// Wrap a frame stream.
    ///
    /// `cancel` must be the token the transport under `inner` observes;
    /// `on_finish` runs exactly once when the stream terminates.
    pub fn new(
        inner: impl Stream<Item = Result<StreamFrame<T>>> + Send + 'static,
        cancel: CancellationToken,
        on_finish: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            inner: Some(Box::pin(inner)),
            handle: AbortHandle {
                token: cancel,
                cleanup: Cleanup::new(on_finish),
            },
            state: StreamState::Running,
        }
    }

    /// Build the full NDJSON pipeline over a raw byte stream.
    pub fn from_ndjson<S, E>(
        byte_stream: S,
        cancel: CancellationToken,
        on_finish: impl FnOnce() + Send + 'static,
    ) -> Self
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
        E: Into<ClientError> + Send + 'static,
    {
        let frames = records(lines(byte_stream, cancel.clone()));
        Self::new(frames, cancel, on_finish)
    }
}

impl<T> AbortableStream<T> {
    /// Cancel the underlying request. Safe to call repeatedly or after the
    /// stream has finished.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// A handle that can abort this stream from another task.
    pub fn abort_handle(&self) -> AbortHandle {
        self.handle.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Whether the stream has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.state != StreamState::Running
    }

    fn finish(&mut self, state: StreamState) {
        self.state = state;
        // Dropping the pipeline drops the response body and closes the connection.
        self.inner = None;
        self.handle.cleanup.run();
        tracing::debug!(state = ?state, "stream finished");
    }
}

impl<T: StreamRecord> Stream for AbortableStream<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.state != StreamState::Running {
            return Poll::Ready(None);
        }
        if this.handle.token.is_cancelled() {
            this.finish(StreamState::Aborted);
            return Poll::Ready(None);
        }
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match inner.as_mut().poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(StreamFrame::Record(record)))) => {
                if record.is_terminal() {
                    this.finish(StreamState::Completed);
                }
                Poll::Ready(Some(Ok(record)))
            }
            Poll::Ready(Some(Ok(StreamFrame::Error(message)))) => {
                this.finish(StreamState::Errored);
                Poll::Ready(Some(Err(ClientError::Upstream(message))))
            }
            Poll::Ready(Some(Err(e))) => {
                this.finish(StreamState::Errored);
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                if this.handle.token.is_cancelled() {
                    this.finish(StreamState::Aborted);
                    Poll::Ready(None)
                } else {
                    this.finish(StreamState::Incomplete);
                    Poll::Ready(Some(Err(ClientError::IncompleteStream)))
                }
            }
        }
    }
}

impl<T: StreamRecord> FusedStream for AbortableStream<T> {
    fn is_terminated(&self) -> bool {
        self.is_finished()
    }
}

impl<T> Drop for AbortableStream<T> {
    fn drop(&mut self) {
        if self.state == StreamState::Running {
            self.handle.token.cancel();
        }
        self.handle.cleanup.run();
    }
}

impl<T> std::fmt::Debug for AbortableStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbortableStream")
            .field("state", &self.state)
            .field("aborted", &self.handle.is_aborted())
            .finish()
    }
}
