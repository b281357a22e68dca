//! Configuration validation.
//!
//! Serde handles syntax; these checks cover value ranges and cross-field
//! invariants. Every error is reported, not just the first.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{RequestTemplate, RetryOptions, ServiceConfig};

/// A single semantic problem found in a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("maxDelayIsMs ({max}) must not be below minDelayIsMs ({min})")]
    DelayRange { min: u64, max: u64 },

    #[error("jitterEnd ({end}) must not be below jitterStart ({start})")]
    JitterRange { start: u64, end: u64 },

    #[error("invalid HTTP method: {0:?}")]
    Method(String),

    #[error("invalid endpoint {endpoint:?}: {reason}")]
    Endpoint { endpoint: String, reason: String },

    #[error("invalid {field} address {value:?}")]
    Address { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// Validate the retry section of a client settings document.
pub fn validate_retry_options(options: &RetryOptions) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if options.max_delay_is_ms < options.min_delay_is_ms {
        errors.push(ValidationError::DelayRange {
            min: options.min_delay_is_ms,
            max: options.max_delay_is_ms,
        });
    }
    if options.jitter_end < options.jitter_start {
        errors.push(ValidationError::JitterRange {
            start: options.jitter_start,
            end: options.jitter_end,
        });
    }

    finish(errors)
}

/// Validate the request section of a client settings document.
pub fn validate_request(request: &RequestTemplate) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if request.verb.is_empty() || !request.verb.bytes().all(|b| b.is_ascii_alphabetic()) {
        errors.push(ValidationError::Method(request.verb.clone()));
    }
    match Url::parse(&request.endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::Endpoint {
            endpoint: request.endpoint.clone(),
            reason: format!("unsupported scheme {}", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::Endpoint {
            endpoint: request.endpoint.clone(),
            reason: e.to_string(),
        }),
    }
    if request.timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "request.timeoutSecs" });
    }

    finish(errors)
}

/// Validate a service configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::Address {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }
    if config.admission.capacity == 0 {
        errors.push(ValidationError::Zero { field: "admission.capacity" });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_secs" });
    }

    finish(errors)
}

fn finish(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn options(min: u64, max: u64, jitter: (u64, u64)) -> RetryOptions {
        RetryOptions {
            min_delay_is_ms: min,
            max_delay_is_ms: max,
            max_retry: 3,
            jitter_start: jitter.0,
            jitter_end: jitter.1,
            retry_transport_errors: false,
        }
    }

    #[test]
    fn test_retry_options_report_every_error() {
        assert!(validate_retry_options(&options(100, 1000, (1, 10))).is_ok());

        let errors = validate_retry_options(&options(1000, 100, (10, 1))).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], ValidationError::DelayRange { min: 1000, max: 100 });
        assert_eq!(errors[1], ValidationError::JitterRange { start: 10, end: 1 });
    }

    #[test]
    fn test_request_validation() {
        let mut request = RequestTemplate {
            verb: "POST".into(),
            endpoint: "http://localhost:5000/api/service".into(),
            headers: HashMap::new(),
            content_headers: HashMap::new(),
            body: None,
            timeout_secs: 30,
        };
        assert!(validate_request(&request).is_ok());

        request.verb = "PO ST".into();
        request.endpoint = "ftp://localhost/file".into();
        let errors = validate_request(&request).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[1], ValidationError::Endpoint { .. }));
    }

    #[test]
    fn test_service_config_validation() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());

        let mut config = ServiceConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.admission.capacity = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
