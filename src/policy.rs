//! Retry classification.
//!
//! A policy looks at the outcome of one attempt and decides whether the
//! logical request should be sent again. Cancellation of the caller's
//! [`RequestContext`] always wins over every other rule.

use std::error::Error as StdError;
use std::sync::Arc;

use reqwest::{Response, StatusCode};

use crate::context::{Cancellation, RequestContext};

/// Non-standard "Enhance Your Calm" rate-limit status.
pub(crate) const ENHANCE_YOUR_CALM: u16 = 420;

// TLS stacks behind reqwest do not surface a typed verification error, so
// certificate rejections are recognized by message.
const CERTIFICATE_MARKERS: &[&str] = &[
    "invalid peer certificate",
    "certificate verify failed",
    "certificate is not trusted",
    "CertificateVerificationError",
];

const HEADER_MARKERS: &[&str] = &["header"];

/// Classification function stored by [`crate::RetryClient`].
pub type CheckRetry = Arc<
    dyn Fn(&RequestContext, Result<&Response, &reqwest::Error>) -> RetryDecision + Send + Sync,
>;

/// Transport failures that no amount of retrying will fix.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum FatalCause {
    #[error("stopped after too many redirects")]
    TooManyRedirects,
    #[error("unsupported protocol scheme")]
    UnsupportedScheme,
    #[error("invalid header name or value")]
    InvalidHeader,
    #[error("certificate is not trusted")]
    UntrustedCertificate,
    #[error("request could not be built")]
    InvalidRequest,
}

/// Why a policy decided the way it did.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum RetryCause {
    #[error(transparent)]
    Cancelled(#[from] Cancellation),
    #[error(transparent)]
    Fatal(#[from] FatalCause),
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(StatusCode),
}

/// Output of a retry policy for one attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryDecision {
    pub should_retry: bool,
    pub cause: Option<RetryCause>,
}

impl RetryDecision {
    pub fn retry(cause: Option<RetryCause>) -> Self {
        Self {
            should_retry: true,
            cause,
        }
    }

    pub fn stop(cause: Option<RetryCause>) -> Self {
        Self {
            should_retry: false,
            cause,
        }
    }
}

/// Retries on connection errors and server errors.
///
/// Causes are dropped, except for cancellation of `ctx`.
pub fn default_retry_policy(
    ctx: &RequestContext,
    outcome: Result<&Response, &reqwest::Error>,
) -> RetryDecision {
    if let Some(cancellation) = ctx.err() {
        return RetryDecision::stop(Some(cancellation.into()));
    }
    RetryDecision {
        cause: None,
        ..base_retry_policy(outcome)
    }
}

/// Same decisions as [`default_retry_policy`], but reports why.
pub fn error_propagated_retry_policy(
    ctx: &RequestContext,
    outcome: Result<&Response, &reqwest::Error>,
) -> RetryDecision {
    if let Some(cancellation) = ctx.err() {
        return RetryDecision::stop(Some(cancellation.into()));
    }
    base_retry_policy(outcome)
}

fn base_retry_policy(outcome: Result<&Response, &reqwest::Error>) -> RetryDecision {
    match outcome {
        Err(err) => match fatal_cause(err) {
            Some(cause) => RetryDecision::stop(Some(cause.into())),
            None => RetryDecision::retry(None),
        },
        Ok(response) => classify_status(response.status()),
    }
}

/// Classifies a response status.
///
/// `StatusCode` cannot carry 0, but codes past the 5xx range are treated
/// like server errors.
pub fn classify_status(status: StatusCode) -> RetryDecision {
    if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == ENHANCE_YOUR_CALM {
        return RetryDecision::retry(None);
    }
    if status.as_u16() >= 500 && status != StatusCode::NOT_IMPLEMENTED {
        return RetryDecision::retry(Some(RetryCause::UnexpectedStatus(status)));
    }
    RetryDecision::stop(None)
}

/// Returns the fatal cause of a transport error, if it has one.
pub fn fatal_cause(err: &reqwest::Error) -> Option<FatalCause> {
    if err.is_redirect() {
        return Some(FatalCause::TooManyRedirects);
    }
    if err.is_builder() {
        if err
            .url()
            .is_some_and(|url| !matches!(url.scheme(), "http" | "https"))
        {
            return Some(FatalCause::UnsupportedScheme);
        }
        if chain_mentions(err, HEADER_MARKERS) {
            return Some(FatalCause::InvalidHeader);
        }
        return Some(FatalCause::InvalidRequest);
    }
    if certificate_rejected(err) {
        return Some(FatalCause::UntrustedCertificate);
    }
    None
}

pub(crate) fn certificate_rejected(err: &(dyn StdError + 'static)) -> bool {
    chain_mentions(err, CERTIFICATE_MARKERS)
}

fn chain_mentions(err: &(dyn StdError + 'static), markers: &[&str]) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        let message = err.to_string();
        if markers.iter().any(|marker| message.contains(marker)) {
            return true;
        }
        current = err.source();
    }
    false
}
