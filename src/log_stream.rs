//! Incremental console log reading.
//!
//! A [`LogStream`] repeatedly asks a [`LogSource`] for the text past its
//! current offset and yields each chunk in order. It stops after the source
//! reports no more data, or after the first failed fetch.
//!
//! Consumers either pull ([`LogStream::next_chunk`]), treat it as a
//! [`Stream`], or hand it a sink and await [`LogStream::finish`].

use crate::{Error, ProgressiveText};
use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use tokio::time::{Instant, sleep_until};

pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_millis(1000);

/// Something that serves a growing text log in byte-offset chunks.
#[async_trait]
pub trait LogSource: Send + Sync + 'static {
    /// Return the text starting at byte `start`, the total size known so
    /// far and whether more data is expected.
    async fn fetch_log_chunk(&self, start: u64) -> Result<ProgressiveText, Error>;
}

#[async_trait]
impl<T: LogSource + ?Sized> LogSource for Arc<T> {
    async fn fetch_log_chunk(&self, start: u64) -> Result<ProgressiveText, Error> {
        (**self).fetch_log_chunk(start).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogStreamOptions {
    /// Byte offset of the first fetch.
    pub start: u64,
    /// Minimum spacing between the starts of two fetches.
    ///
    /// The first fetch is issued as soon as the stream is polled, not one
    /// interval after it was created.
    pub interval: Duration,
}

impl Default for LogStreamOptions {
    fn default() -> Self {
        Self {
            start: 0,
            interval: DEFAULT_LOG_INTERVAL,
        }
    }
}

impl LogStreamOptions {
    #[must_use]
    pub fn start(mut self, start: u64) -> Self {
        self.start = start;
        self
    }

    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Ended,
    Failed,
}

struct LogCursor<S> {
    source: Arc<S>,
    offset: u64,
    interval: Duration,
    last_fetch: Option<Instant>,
    state: State,
}

impl<S: LogSource> LogCursor<S> {
    async fn step(&mut self) -> Option<Result<String, Error>> {
        if self.state != State::Open {
            return None;
        }

        if let Some(previous) = self.last_fetch {
            sleep_until(previous + self.interval).await;
        }
        self.last_fetch = Some(Instant::now());

        let chunk = match self.source.fetch_log_chunk(self.offset).await {
            Ok(chunk) => chunk,
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(offset = self.offset, error = %err, "log fetch failed");
                self.state = State::Failed;
                return Some(Err(err));
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            offset = self.offset,
            size = chunk.size,
            more = chunk.more,
            bytes = chunk.text.len(),
            "log fetch"
        );

        // Some controllers briefly report a shorter log while it is being
        // rotated. Keep the cursor and try again on the next pull.
        if chunk.size < self.offset {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                offset = self.offset,
                size = chunk.size,
                "log size went backwards, keeping offset"
            );
            return Some(Ok(String::new()));
        }

        self.offset = chunk.size;
        if !chunk.more {
            self.state = State::Ended;
        }

        #[cfg(feature = "metrics")]
        crate::transport::metrics::record_log_chunk(chunk.text.len());

        Some(Ok(chunk.text))
    }
}

type Step<S> = Pin<Box<dyn Future<Output = (LogCursor<S>, Option<Result<String, Error>>)> + Send>>;

/// Ordered, rate-limited stream of log chunks.
///
/// Yields `Ok(chunk)` for every fetch (possibly empty), `Err` at most once,
/// and then `None`. Nothing is fetched until the stream is polled, and
/// dropping it cancels any fetch in flight.
///
/// The first pull fetches immediately. Later pulls wait until
/// [`LogStreamOptions::interval`] has passed since the previous fetch
/// started.
pub struct LogStream<S> {
    cursor: Option<LogCursor<S>>,
    pending: Option<Step<S>>,
    offset: u64,
}

impl<S: LogSource> LogStream<S> {
    pub fn new(source: S, options: LogStreamOptions) -> Self {
        Self::from_arc(Arc::new(source), options)
    }

    pub fn from_arc(source: Arc<S>, options: LogStreamOptions) -> Self {
        Self {
            cursor: Some(LogCursor {
                source,
                offset: options.start,
                interval: options.interval,
                last_fetch: None,
                state: State::Open,
            }),
            pending: None,
            offset: options.start,
        }
    }

    /// Offset after the last completed fetch.
    ///
    /// Passing it as [`LogStreamOptions::start`] to a new stream resumes
    /// reading where this one stopped.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Pull the next chunk. `None` once the log ended or failed.
    pub async fn next_chunk(&mut self) -> Option<Result<String, Error>> {
        self.next().await
    }

    /// Drive the stream to the end, handing every non-empty chunk to `sink`.
    ///
    /// Resolves to the final offset when the source reported no more data,
    /// or to the first fetch error.
    pub async fn finish<F>(mut self, mut sink: F) -> Result<u64, Error>
    where
        F: FnMut(&str),
    {
        while let Some(chunk) = self.next_chunk().await {
            let chunk = chunk?;
            if !chunk.is_empty() {
                sink(&chunk);
            }
        }
        Ok(self.offset)
    }
}

impl<S: LogSource> Stream for LogStream<S> {
    type Item = Result<String, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.pending.is_none() {
            let Some(mut cursor) = this.cursor.take() else {
                return Poll::Ready(None);
            };
            this.pending = Some(Box::pin(async move {
                let item = cursor.step().await;
                (cursor, item)
            }));
        }

        let Some(pending) = this.pending.as_mut() else {
            return Poll::Ready(None);
        };
        match pending.as_mut().poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready((cursor, item)) => {
                this.pending = None;
                this.offset = cursor.offset;
                this.cursor = Some(cursor);
                Poll::Ready(item)
            }
        }
    }
}

impl<S> std::fmt::Debug for LogStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStream")
            .field("offset", &self.offset)
            .field("fetching", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}
