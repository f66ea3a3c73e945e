//! Cancellation and deadline handle bound to every request.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// A `Context` carries the caller's cancellation signal and an optional deadline.
///
/// Clones share the same [`CancellationToken`], so cancelling any clone aborts
/// every call using it. The deadline bounds the whole call, independently of the
/// per-attempt timeout; whichever expires first aborts the attempt in flight.
///
/// ```
/// use std::time::Duration;
/// use reqwest_attempt::Context;
///
/// let ctx = Context::background().with_timeout(Duration::from_secs(5));
/// assert!(ctx.err().is_none());
/// ctx.cancel();
/// assert!(ctx.err().unwrap().is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline, until told otherwise.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive the context from an existing token, typically one owned by a
    /// surrounding task or shutdown handler.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Bound the context to `timeout` from now. A timeout too large to
    /// represent leaves the deadline as it was.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Bound the context to `deadline`. An earlier existing deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns the reason the context is done, or `None` if it is still live.
    pub fn err(&self) -> Option<Error> {
        if self.token.is_cancelled() {
            Some(Error::Cancelled)
        } else if self.deadline.is_some_and(|d| d <= Instant::now()) {
            Some(Error::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Resolves once the context is cancelled or its deadline has passed.
    async fn done(&self) -> Error {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => Error::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Error::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                Error::Cancelled
            }
        }
    }

    /// Drive `fut` to completion unless the context finishes first, in which
    /// case `fut` is dropped and the context error is returned.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output>
    where
        F: Future,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            output = fut => Ok(output),
        }
    }

    /// Wait for `duration`, returning early with the context error if the
    /// context finishes first.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.run(tokio::time::sleep(duration)).await
    }
}
