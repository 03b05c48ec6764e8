//! Cancellation and deadline context for a single request execution.
//!
//! A [`RequestContext`] governs only the execution of the request it is attached to. Building a
//! request never consults it. Canceling the token, or letting the deadline pass, makes the
//! pending `send()` fail with an execution error; nothing is retried.
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context without deadline that is only canceled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Wraps an existing token, so a caller can cancel a whole group of requests at once.
    pub fn from_token(cancel: CancellationToken) -> Self {
        Self { cancel, deadline: None }
    }

    /// Derives a context that is canceled together with this one. The child may only shorten
    /// the deadline, never extend it.
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let own = timeout.map(|t| Instant::now() + t);
        let deadline = match (self.deadline, own) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            cancel: self.cancel.child_token(),
            deadline,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[inline]
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}
