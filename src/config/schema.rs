//! Configuration schema definitions.
//!
//! Two documents live here:
//! - [`ServiceConfig`]: the capacity-gated service, loaded from TOML.
//! - [`ClientSettings`]: the retry client, a JSON document whose request body
//!   may carry the `{{ id }}` correlation token.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the capacity-gated service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Admission control settings.
    pub admission: AdmissionConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Admission gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Maximum number of requests doing work at once.
    pub capacity: usize,

    /// Value of the `Retry-After` header sent with 429 responses, in seconds.
    pub retry_after_secs: u64,

    /// Simulated backend processing time for an admitted request, in milliseconds.
    pub work_latency_ms: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            capacity: 1,
            retry_after_secs: 5,
            work_latency_ms: 1000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Full,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

/// Client settings document.
///
/// ```json
/// {
///   "retry": { "minDelayIsMs": 1000, "maxDelayIsMs": 5000, "maxRetry": 50,
///              "jitterStart": 1, "jitterEnd": 1000 },
///   "request": { "verb": "POST", "endpoint": "http://localhost:5000/api/service",
///                "headers": {}, "contentHeaders": { "Content-Type": "application/json" },
///                "body": "{\"id\":\"{{ id }}\"}" }
/// }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSettings {
    pub retry: RetryOptions,
    pub request: RequestTemplate,
}

/// Raw retry options as they appear in the settings document.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryOptions {
    /// Minimum (or base) delay in milliseconds.
    pub min_delay_is_ms: u64,

    /// Maximum delay in milliseconds.
    pub max_delay_is_ms: u64,

    /// Maximum number of retries after the first attempt.
    pub max_retry: u32,

    /// Lower bound of the random jitter, in milliseconds.
    #[serde(default)]
    pub jitter_start: u64,

    /// Upper bound of the random jitter, in milliseconds.
    #[serde(default)]
    pub jitter_end: u64,

    /// Retry connection-level failures under the same policy as 5xx responses.
    #[serde(default)]
    pub retry_transport_errors: bool,
}

/// Request section of the settings document.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestTemplate {
    /// HTTP method.
    pub verb: String,

    /// Absolute target URL.
    pub endpoint: String,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Headers that describe the body; only sent when a body is present.
    #[serde(default)]
    pub content_headers: HashMap<String, String>,

    #[serde(default)]
    pub body: Option<String>,

    /// Per-attempt HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}
