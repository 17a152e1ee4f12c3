//! Transport boundary: the HTTP-style request primitive both provider
//! adapters issue their native requests through.
//!
//! [`Transport`] is the seam that keeps the merge logic independent of the
//! network. [`HttpTransport`] is the production implementation on top of a
//! shared [`reqwest::Client`]; tests substitute an in-memory double.

use std::time::Duration;

use serde_json::Value;

use crate::config::SearchConfig;
use crate::error::SearchError;

/// Content type sent with every JSON request body.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// HTTP method of a transport request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

/// A single request handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// Absolute endpoint URL.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Serialized request body.
    pub body: String,
    /// `Content-Type` header value.
    pub content_type: &'static str,
    /// Per-request timeout overriding the client default.
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    /// A JSON `POST` with the client's default timeout.
    pub fn post_json(url: impl Into<String>, body: String) -> Self {
        Self {
            url: url.into(),
            method: Method::Post,
            body,
            content_type: JSON_CONTENT_TYPE,
            timeout: None,
        }
    }

    /// Override the timeout for this request only.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Issues native requests and returns parsed JSON.
///
/// Implementations must be `Send + Sync`: one transport is shared by every
/// concurrent sub-query. Cancellation is handled by the caller dropping the
/// returned future (see [`crate::QueryScope::guard`]).
pub trait Transport: Send + Sync {
    /// Send `request` and parse the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Transport`] on network failure, timeout or a
    /// non-success status, and [`SearchError::Parse`] if the body is not JSON.
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl std::future::Future<Output = Result<Value, SearchError>> + Send;
}

/// [`Transport`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Transport`] if the client cannot be constructed.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: build_client(config)?,
        })
    }
}

/// Build a [`reqwest::Client`] with the configured timeout and user agent.
///
/// # Errors
///
/// Returns [`SearchError::Transport`] if the client cannot be constructed.
pub fn build_client(config: &SearchConfig) -> Result<reqwest::Client, SearchError> {
    let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_seconds));
    if let Some(ref ua) = config.user_agent {
        builder = builder.user_agent(ua.clone());
    }
    builder
        .build()
        .map_err(|e| SearchError::Transport(format!("failed to build HTTP client: {e}")))
}

impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<Value, SearchError> {
        tracing::trace!(url = %request.url, "transport request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        builder = builder
            .header(reqwest::header::CONTENT_TYPE, request.content_type)
            .body(request.body);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SearchError::Transport(format!("request to {} failed: {e}", request.url)))?
            .error_for_status()
            .map_err(|e| SearchError::Transport(format!("HTTP error from {}: {e}", request.url)))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| SearchError::Transport(format!("response read failed: {e}")))?;

        tracing::trace!(bytes = body.len(), "transport response received");

        serde_json::from_slice(&body)
            .map_err(|e| SearchError::Parse(format!("response from {} is not JSON: {e}", request.url)))
    }
}
