use reqwest::{Method, StatusCode};

use crate::{Cancellation, FatalCause, RetryCause};

/// Error returned by [`crate::RetryClient`] after all applicable retries.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The caller's context was cancelled or its deadline passed.
    #[error(transparent)]
    Cancelled(#[from] Cancellation),
    /// A transport error the retry policy classified as permanent.
    #[error("{method} {url}: {cause}")]
    Fatal {
        method: Method,
        url: String,
        cause: FatalCause,
        #[source]
        source: reqwest::Error,
    },
    /// Retries were exhausted, or the policy refused to retry a failure.
    #[error(
        "{method} {url} giving up after {attempts} attempt(s){}",
        describe_last(.status, .cause)
    )]
    GaveUp {
        method: Method,
        url: String,
        attempts: u32,
        /// Status of the last response, when one was received.
        status: Option<StatusCode>,
        /// Buffered body of the last response.
        body: Option<String>,
        /// Reason reported by the retry policy, if any.
        cause: Option<RetryCause>,
        /// Last transport error, when no response was received.
        #[source]
        source: Option<reqwest::Error>,
    },
    /// The pooled HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl TransportError {
    /// Returns the status of the last response, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::GaveUp { status, .. } => *status,
            _ => None,
        }
    }

    /// Number of attempts made before this error was returned.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::GaveUp { attempts, .. } => Some(*attempts),
            Self::Fatal { .. } => Some(1),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

fn describe_last(status: &Option<StatusCode>, cause: &Option<RetryCause>) -> String {
    match (cause, status) {
        (Some(cause), _) => format!(": {cause}"),
        (None, Some(status)) => format!(": last status {status}"),
        (None, None) => String::new(),
    }
}

/// Error type returned by [`crate::StatuspageClient`].
#[derive(Debug, thiserror::Error)]
pub enum StatuspageError {
    /// The request could not be completed after applicable retries.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Request body serialization error.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
    /// Response decoding error.
    #[error("decode error: {0}")]
    Decode(String),
    /// Invalid provider configuration.
    #[error("config error: {0}")]
    Config(String),
}
