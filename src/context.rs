use std::future::pending;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Why a request context stopped accepting work.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Cancellation {
    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,
    /// The caller-supplied deadline passed.
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

/// Per-call cancellation signal and deadline.
///
/// The default context never cancels. Contexts are cheap to clone; clones
/// share the same cancellation token.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    token: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Creates a context with no cancellation and no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Sets an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline relative to now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the cancellation reason if the context is already done.
    ///
    /// Explicit cancellation wins over an expired deadline.
    pub fn err(&self) -> Option<Cancellation> {
        if self.token.as_ref().is_some_and(|token| token.is_cancelled()) {
            return Some(Cancellation::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            return Some(Cancellation::DeadlineExceeded);
        }
        None
    }

    /// Resolves once the context is cancelled or its deadline passes.
    ///
    /// Never resolves for a context without token and deadline.
    pub async fn done(&self) -> Cancellation {
        let cancelled = async {
            match &self.token {
                Some(token) => token.cancelled().await,
                None => pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Cancellation::Cancelled,
            _ = expired => Cancellation::DeadlineExceeded,
        }
    }
}
