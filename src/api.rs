use std::fmt;

use reqwest::{header, Method, Response};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    ClientOptions, Request, RequestContext, Result, RetryClient, StatuspageError,
};

/// Public Statuspage REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.statuspage.io/v1";

const API_KEY_ENV_VARS: [&str; 2] = ["STATUSPAGE_API_KEY", "SP_API_KEY"];

/// Default `User-Agent` value sent with every API request.
pub fn default_user_agent() -> String {
    format!("statuspage-http/{}", env!("CARGO_PKG_VERSION"))
}

/// Explicit configuration for a [`StatuspageClient`].
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub user_agent: String,
    pub options: ClientOptions,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("options", &self.options)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            user_agent: default_user_agent(),
            options: ClientOptions::default(),
        }
    }

    /// Reads the API key from the environment.
    ///
    /// Reads `STATUSPAGE_API_KEY`, falling back to `SP_API_KEY`. Returns an
    /// error if neither is set to a non-empty value.
    pub fn from_env() -> std::result::Result<Self, String> {
        let api_key = API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                format!(
                    "api_key must be set via {} or {}",
                    API_KEY_ENV_VARS[0], API_KEY_ENV_VARS[1]
                )
            })?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Appends `suffix` to the default user agent.
    pub fn with_user_agent_suffix(mut self, suffix: impl AsRef<str>) -> Self {
        let suffix = suffix.as_ref().trim();
        if !suffix.is_empty() {
            self.user_agent = format!("{} {suffix}", default_user_agent());
        }
        self
    }

    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }
}

#[derive(Clone)]
/// JSON client for the Statuspage REST API.
///
/// Resource-agnostic: callers pass paths such as `pages/{page_id}/components`
/// and their own request/response types.
pub struct StatuspageClient {
    transport: RetryClient,
    base_url: String,
    authorization: String,
    user_agent: String,
}

impl fmt::Debug for StatuspageClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatuspageClient")
            .field("base_url", &self.base_url)
            .field("authorization", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("transport", &self.transport)
            .finish()
    }
}

impl StatuspageClient {
    /// Creates a client over a pooled retrying transport.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let transport = RetryClient::new()?.with_options(config.options.clone());
        Self::with_transport(config, transport)
    }

    /// Creates a client over a caller-supplied transport.
    ///
    /// The transport keeps its own options; `config.options` is ignored.
    pub fn with_transport(config: ProviderConfig, transport: RetryClient) -> Result<Self> {
        let api_key = config.api_key.trim();
        if api_key.is_empty() {
            return Err(StatuspageError::Config("api_key must be set".to_owned()));
        }

        #[cfg(feature = "tracing")]
        tracing::info!(base_url = %config.base_url, "initializing Statuspage client");

        Ok(Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            authorization: format!("OAuth {api_key}"),
            user_agent: config.user_agent,
        })
    }

    pub fn transport(&self) -> &RetryClient {
        &self.transport
    }

    /// Resolves an API path against the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, ctx: &RequestContext, path: &str) -> Result<T> {
        let response = self.send(ctx, self.request(Method::GET, path)).await?;
        decode_json(response).await
    }

    pub async fn post<B, T>(&self, ctx: &RequestContext, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path).json(body)?;
        let response = self.send(ctx, request).await?;
        decode_json(response).await
    }

    pub async fn put<B, T>(&self, ctx: &RequestContext, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PUT, path).json(body)?;
        let response = self.send(ctx, request).await?;
        decode_json(response).await
    }

    pub async fn patch<B, T>(&self, ctx: &RequestContext, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PATCH, path).json(body)?;
        let response = self.send(ctx, request).await?;
        decode_json(response).await
    }

    /// Deletes a resource, ignoring any response body.
    pub async fn delete(&self, ctx: &RequestContext, path: &str) -> Result<()> {
        self.send(ctx, self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> Request {
        Request::new(method, self.url(path))
            .header(header::AUTHORIZATION.as_str(), self.authorization.as_str())
            .header(header::USER_AGENT.as_str(), self.user_agent.as_str())
            .header(header::ACCEPT.as_str(), "application/json")
    }

    /// Runs the request through the transport and rejects non-success
    /// statuses.
    async fn send(&self, ctx: &RequestContext, request: Request) -> Result<Response> {
        let response = self.transport.execute(ctx, &request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(StatuspageError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await.map_err(|err| {
        StatuspageError::Decode(format!("failed to read response body: {err}"))
    })?;
    serde_json::from_str(&body).map_err(|err| {
        StatuspageError::Decode(format!("invalid response JSON: {err}; body: {body}"))
    })
}
