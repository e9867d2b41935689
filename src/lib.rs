//! `statuspage-http` is a retrying async HTTP transport for the Statuspage
//! REST API.
//!
//! - [`RetryClient::execute`] sends a [`Request`], classifies every attempt
//!   with a retry policy and sleeps between attempts with exponential
//!   backoff that honors `Retry-After`.
//! - [`StatuspageClient`] layers API-key auth and JSON encoding on top.

mod api;
mod backoff;
mod client;
mod context;
mod error;
mod options;
mod policy;
mod request;

pub use api::{default_user_agent, ProviderConfig, StatuspageClient, DEFAULT_BASE_URL};
pub use backoff::{default_backoff, Backoff};
pub use client::{pooled_http_client, RetryClient};
pub use context::{Cancellation, RequestContext};
pub use error::{StatuspageError, TransportError};
pub use options::ClientOptions;
pub use policy::{
    classify_status, default_retry_policy, error_propagated_retry_policy, fatal_cause,
    CheckRetry, FatalCause, RetryCause, RetryDecision,
};
pub use request::Request;

pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, StatuspageError>;
