//! Outbound HTTP to the service.
//!
//! # Responsibilities
//! - Turn a [`RequestOptions`] into one reqwest call
//! - Surface status and `Retry-After` to the backoff policy
//! - Separate caller mistakes (never retried) from transport failures

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use thiserror::Error;

use crate::http::{parse_retry_after, RequestOptions, X_REQUEST_ID};
use crate::resilience::{is_retryable_status, RetryClassifier, ServerHint, TransportErrorPolicy};

/// Error type for a single send.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// Connection, timeout or body-read failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}

/// What one attempt obtained from the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    pub status: u16,
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl ServerHint for ServiceResponse {
    fn status(&self) -> Option<u16> {
        Some(self.status)
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

/// Shared HTTP client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
}

impl ServiceClient {
    /// Create a client whose requests time out after `timeout` unless the
    /// request carries its own.
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Send `options` once.
    pub async fn send(&self, options: &RequestOptions) -> Result<ServiceResponse, ClientError> {
        let mut headers = header_map(&options.headers)?;
        headers.insert(
            X_REQUEST_ID,
            HeaderValue::from_str(&options.correlation_id.to_string())
                .map_err(|e| ClientError::InvalidRequest(e.to_string()))?,
        );

        let mut request = self
            .http
            .request(options.method.clone(), options.url.clone())
            .timeout(options.timeout);
        if let Some(body) = &options.body {
            headers.extend(header_map(&options.content_headers)?);
            request = request.body(body.clone());
        }

        let response = request.headers(headers).send().await?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await?;

        tracing::debug!(
            correlation_id = %options.correlation_id,
            status,
            retry_after_ms = retry_after.map(|d| d.as_millis() as u64),
            "Response received"
        );

        Ok(ServiceResponse {
            status,
            retry_after,
            body,
        })
    }
}

fn header_map(
    headers: &std::collections::HashMap<String, String>,
) -> Result<HeaderMap, ClientError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ClientError::InvalidRequest(format!("invalid header name {:?}", name)))?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            ClientError::InvalidRequest(format!("invalid value for header {}", name))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

/// 408, 429 and 5xx are retried; transport errors only when enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpClassifier {
    transport: TransportErrorPolicy,
}

impl HttpClassifier {
    pub fn new(transport: TransportErrorPolicy) -> Self {
        Self { transport }
    }
}

impl RetryClassifier<ServiceResponse, ClientError> for HttpClassifier {
    fn is_retryable(&self, response: &ServiceResponse) -> bool {
        is_retryable_status(response.status)
    }

    fn is_retryable_error(&self, error: &ClientError) -> bool {
        self.transport == TransportErrorPolicy::Retry && error.is_transport()
    }
}
