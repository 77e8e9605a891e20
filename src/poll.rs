//! Bounded-wait polling.
//!
//! [`wait_while`] keeps calling a fetch operation at a fixed interval until a
//! predicate over the latest [`PollOutcome`] says to stop, or until the
//! optional timeout fires. It is what the services use to wait for a queue
//! item to get an executor, a build to appear, or a build to finish.

use crate::Error;
use std::{
    future::Future,
    time::{Duration, Instant},
};
use tokio::time::{sleep, timeout};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Cadence and deadline of a bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Pause between two attempts.
    pub interval: Duration,
    /// Give up with [`Error::Timeout`] after this long. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

impl PollOptions {
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Result of one poll attempt.
///
/// A failed attempt is data, not an early return: the predicate decides
/// whether a failure (say, a `404` for a build that does not exist yet) is
/// worth waiting through.
#[derive(Debug)]
pub struct PollOutcome<T> {
    /// The attempt completed without a transport/HTTP error.
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<Error>,
}

impl<T> PollOutcome<T> {
    #[must_use]
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(error: Error) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error),
        }
    }

    /// Await `fut` and record its result instead of propagating the error.
    pub async fn capture<F>(fut: F) -> Self
    where
        F: Future<Output = Result<T, Error>>,
    {
        fut.await.into()
    }

    /// `true` when the attempt failed with a `404`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.error.as_ref().is_some_and(Error::is_not_found)
    }

    fn into_result(self) -> Result<Option<T>, Error> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.data),
        }
    }
}

impl<T> From<Result<T, Error>> for PollOutcome<T> {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(err) => Self::failure(err),
        }
    }
}

/// Poll `fetch` until `should_continue` returns `false`.
///
/// `fetch` is invoked immediately, then again `options.interval` after each
/// attempt the predicate wants to continue from. Attempts never overlap.
///
/// Resolves with the data of the first outcome the predicate accepts. When
/// that outcome is a failure, its error is returned unchanged. When
/// `options.timeout` elapses first, the attempt in flight is dropped and
/// [`Error::Timeout`] is returned.
pub async fn wait_while<T, F, Fut, P>(
    fetch: F,
    should_continue: P,
    options: PollOptions,
) -> Result<Option<T>, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PollOutcome<T>>,
    P: FnMut(&PollOutcome<T>) -> bool,
{
    poll_attempts(fetch, should_continue, options)
        .await?
        .into_result()
}

/// Like [`wait_while`], for a fetch that either yields a value or fails.
///
/// The accepted attempt is returned as is, so a successful wait always
/// carries the value.
pub async fn wait_for<T, F, Fut, P>(
    fetch: F,
    should_continue: P,
    options: PollOptions,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
    P: FnMut(&Result<T, Error>) -> bool,
{
    poll_attempts(fetch, should_continue, options).await?
}

/// Run attempts until one is accepted. Only the timeout fails here.
async fn poll_attempts<O, F, Fut, P>(
    mut fetch: F,
    mut should_continue: P,
    options: PollOptions,
) -> Result<O, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = O>,
    P: FnMut(&O) -> bool,
{
    let started = Instant::now();
    let attempts = async {
        let mut _attempt = 0u64;
        loop {
            _attempt += 1;
            let outcome = fetch().await;
            let keep_waiting = should_continue(&outcome);

            #[cfg(feature = "tracing")]
            tracing::debug!(attempt = _attempt, keep_waiting, "poll attempt");
            #[cfg(feature = "metrics")]
            crate::transport::metrics::record_poll_attempt(!keep_waiting);

            if !keep_waiting {
                return outcome;
            }
            sleep(options.interval).await;
        }
    };

    let Some(limit) = options.timeout else {
        return Ok(attempts.await);
    };
    match timeout(limit, attempts).await {
        Ok(outcome) => Ok(outcome),
        Err(_) => {
            let elapsed = started.elapsed();
            #[cfg(feature = "tracing")]
            tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "poll timed out");
            #[cfg(feature = "metrics")]
            crate::transport::metrics::record_poll_timeout();
            Err(Error::Timeout { elapsed })
        }
    }
}
