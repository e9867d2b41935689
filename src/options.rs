use std::time::Duration;

/// Configures per-attempt timeout and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub retry_max: u32,
    /// Backoff before the first retry, in milliseconds.
    pub retry_wait_min_ms: u64,
    /// Upper bound for the exponential backoff, in milliseconds.
    ///
    /// A `Retry-After` header sent with 429/420/503 is honored even when it
    /// exceeds this bound.
    pub retry_wait_max_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            retry_max: 4,
            retry_wait_min_ms: 1_000,
            retry_wait_max_ms: 30_000,
        }
    }
}

impl ClientOptions {
    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub(crate) fn retry_wait_min(&self) -> Duration {
        Duration::from_millis(self.retry_wait_min_ms)
    }

    pub(crate) fn retry_wait_max(&self) -> Duration {
        Duration::from_millis(self.retry_wait_max_ms)
    }
}
