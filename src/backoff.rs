use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Response, StatusCode};

use crate::policy::ENHANCE_YOUR_CALM;

/// Backoff function stored by [`crate::RetryClient`].
///
/// Receives the configured minimum and maximum wait, the 0-based number of
/// the attempt that just failed, and its response when there is one.
pub type Backoff =
    Arc<dyn Fn(Duration, Duration, u32, Option<&Response>) -> Duration + Send + Sync>;

/// Exponential backoff that honors integer `Retry-After` headers.
///
/// A 429, 420 or 503 response carrying `Retry-After: <seconds>` waits exactly
/// that long, even past `max`. Otherwise the wait is `min * 2^attempt`,
/// clamped to `max`.
pub fn default_backoff(
    min: Duration,
    max: Duration,
    attempt: u32,
    response: Option<&Response>,
) -> Duration {
    if let Some(wait) = response.and_then(retry_after) {
        return wait;
    }

    match 2u32
        .checked_pow(attempt)
        .and_then(|factor| min.checked_mul(factor))
    {
        Some(wait) if wait <= max => wait,
        _ => max,
    }
}

/// Reads an integer-seconds `Retry-After` from a throttling response.
///
/// HTTP-date values are not parsed and yield `None`.
fn retry_after(response: &Response) -> Option<Duration> {
    let status = response.status();
    let throttled = status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::SERVICE_UNAVAILABLE
        || status.as_u16() == ENHANCE_YOUR_CALM;
    if !throttled {
        return None;
    }

    let value = response.headers().get(header::RETRY_AFTER)?;
    let seconds = value.to_str().ok()?.parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds))
}
