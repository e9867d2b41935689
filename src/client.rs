use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Response;
use tokio::time::sleep;

use crate::{
    backoff::{default_backoff, Backoff},
    policy::{default_retry_policy, CheckRetry},
    Cancellation, ClientOptions, Request, RequestContext, RetryCause, RetryDecision,
    TransportError,
};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const DEFAULT_TCP_KEEPALIVE: Duration = Duration::from_secs(30);

/// Builds the connection-pooling `reqwest` client used by [`RetryClient::new`].
pub fn pooled_http_client() -> reqwest::Result<reqwest::Client> {
    let idle_per_host = std::thread::available_parallelism()
        .map(|n| n.get() + 1)
        .unwrap_or(2);

    reqwest::Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .pool_idle_timeout(DEFAULT_POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(idle_per_host)
        .tcp_keepalive(DEFAULT_TCP_KEEPALIVE)
        .build()
}

#[derive(Clone)]
/// HTTP client that retries transient failures with backoff.
///
/// Cloning is cheap and clones share the connection pool. The client keeps
/// no per-request state, so one instance can serve concurrent callers.
pub struct RetryClient {
    http: reqwest::Client,
    options: ClientOptions,
    check_retry: CheckRetry,
    backoff: Backoff,
}

impl fmt::Debug for RetryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryClient")
            .field("options", &self.options)
            .field("check_retry", &"<fn>")
            .field("backoff", &"<fn>")
            .finish()
    }
}

impl RetryClient {
    /// Creates a client over a pooled transport with default options,
    /// [`default_retry_policy`] and [`default_backoff`].
    pub fn new() -> Result<Self, TransportError> {
        let http = pooled_http_client().map_err(TransportError::Build)?;
        Ok(Self::from_http(http))
    }

    /// Wraps an existing `reqwest` client.
    pub fn from_http(http: reqwest::Client) -> Self {
        Self {
            http,
            options: ClientOptions::default(),
            check_retry: Arc::new(default_retry_policy),
            backoff: Arc::new(default_backoff),
        }
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Replaces the retry classification function.
    pub fn with_check_retry<F>(mut self, check_retry: F) -> Self
    where
        F: Fn(&RequestContext, Result<&Response, &reqwest::Error>) -> RetryDecision
            + Send
            + Sync
            + 'static,
    {
        self.check_retry = Arc::new(check_retry);
        self
    }

    /// Replaces the backoff function.
    pub fn with_backoff<F>(mut self, backoff: F) -> Self
    where
        F: Fn(Duration, Duration, u32, Option<&Response>) -> Duration + Send + Sync + 'static,
    {
        self.backoff = Arc::new(backoff);
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sends `request`, retrying as the configured policy allows.
    ///
    /// Returns the response when the policy accepts it without a cause.
    /// Cancellation of `ctx` is observed before every attempt, during the
    /// send and during the backoff sleep.
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        request: &Request,
    ) -> Result<Response, TransportError> {
        let mut attempt = 0u32;
        loop {
            if let Some(cancellation) = ctx.err() {
                return Err(cancellation.into());
            }

            let send = request
                .to_attempt(&self.http, self.options.timeout())
                .send();
            let outcome = tokio::select! {
                biased;
                cancellation = ctx.done() => return Err(cancellation.into()),
                outcome = send => outcome,
            };

            let decision = (self.check_retry)(ctx, outcome.as_ref());

            #[cfg(feature = "tracing")]
            tracing::debug!(
                method = %request.method(),
                url = request.url(),
                attempt,
                status = ?outcome.as_ref().ok().map(|response| response.status()),
                retry = decision.should_retry,
                cause = ?decision.cause,
                "classified attempt"
            );

            if !decision.should_retry || attempt >= self.options.retry_max {
                return self.finish(request, attempt + 1, outcome, decision).await;
            }

            let wait = (self.backoff)(
                self.options.retry_wait_min(),
                self.options.retry_wait_max(),
                attempt,
                outcome.as_ref().ok(),
            );
            drop(outcome);

            self.wait_before_retry(ctx, request, attempt, wait).await?;
            attempt += 1;
        }
    }

    /// Sleeps for `wait` unless `ctx` finishes first.
    async fn wait_before_retry(
        &self,
        ctx: &RequestContext,
        request: &Request,
        attempt: u32,
        wait: Duration,
    ) -> Result<(), Cancellation> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            method = %request.method(),
            url = request.url(),
            attempt,
            remaining = self.options.retry_max - attempt,
            "retrying request after {} ms",
            wait.as_millis()
        );
        #[cfg(not(feature = "tracing"))]
        let _ = (request, attempt);

        tokio::select! {
            biased;
            cancellation = ctx.done() => Err(cancellation),
            _ = sleep(wait) => Ok(()),
        }
    }

    async fn finish(
        &self,
        request: &Request,
        attempts: u32,
        outcome: reqwest::Result<Response>,
        decision: RetryDecision,
    ) -> Result<Response, TransportError> {
        if let Some(RetryCause::Cancelled(cancellation)) = decision.cause {
            return Err(cancellation.into());
        }

        let err = match outcome {
            Ok(response) if !decision.should_retry && decision.cause.is_none() => {
                return Ok(response);
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.ok();
                TransportError::GaveUp {
                    method: request.method().clone(),
                    url: request.url().to_owned(),
                    attempts,
                    status: Some(status),
                    body,
                    cause: decision.cause,
                    source: None,
                }
            }
            Err(source) => match decision.cause {
                Some(RetryCause::Fatal(cause)) if !decision.should_retry => TransportError::Fatal {
                    method: request.method().clone(),
                    url: request.url().to_owned(),
                    cause,
                    source,
                },
                cause => TransportError::GaveUp {
                    method: request.method().clone(),
                    url: request.url().to_owned(),
                    attempts,
                    status: None,
                    body: None,
                    cause,
                    source: Some(source),
                },
            },
        };

        #[cfg(feature = "tracing")]
        tracing::warn!(error = %err, "request failed");

        Err(err)
    }
}
