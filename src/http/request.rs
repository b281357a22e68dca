//! Request descriptors.
//!
//! # Responsibilities
//! - [`ServiceRequest`]: what the service endpoint accepts (every field optional)
//! - [`RequestOptions`]: a fully typed outbound request, built per logical
//!   request from the rendered settings template

use std::collections::HashMap;
use std::time::Duration;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::config::validation::ValidationError;
use crate::config::RequestTemplate;

/// Request ID header shared by client and service.
pub const X_REQUEST_ID: &str = "x-request-id";

/// JSON descriptor posted to `/api/service`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceRequest {
    pub id: Option<String>,
    pub method: Option<String>,
    pub uri: Option<String>,
    pub headers: HashMap<String, String>,
    pub content_headers: HashMap<String, String>,
    pub body: Option<String>,
}

/// One outbound request, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub correlation_id: Uuid,
    pub method: Method,
    pub url: Url,
    pub headers: HashMap<String, String>,
    /// Applied only when `body` is present.
    pub content_headers: HashMap<String, String>,
    pub body: Option<String>,
    pub timeout: Duration,
}

impl RequestOptions {
    /// Build the request for `correlation_id` from an already rendered template.
    pub fn from_template(
        template: &RequestTemplate,
        correlation_id: Uuid,
    ) -> Result<Self, ValidationError> {
        let method = Method::from_bytes(template.verb.to_ascii_uppercase().as_bytes())
            .map_err(|_| ValidationError::Method(template.verb.clone()))?;
        let url = Url::parse(&template.endpoint).map_err(|e| ValidationError::Endpoint {
            endpoint: template.endpoint.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            correlation_id,
            method,
            url,
            headers: template.headers.clone(),
            content_headers: template.content_headers.clone(),
            body: template.body.clone(),
            timeout: Duration::from_secs(template.timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(verb: &str, endpoint: &str) -> RequestTemplate {
        serde_json::from_value(serde_json::json!({
            "verb": verb,
            "endpoint": endpoint,
            "headers": { "Accept": "application/json" },
            "contentHeaders": { "Content-Type": "application/json" },
            "body": "{\"id\":\"42\"}"
        }))
        .unwrap()
    }

    #[test]
    fn test_from_template() {
        let id = Uuid::new_v4();
        let options =
            RequestOptions::from_template(&template("post", "http://localhost:5000/api/service"), id)
                .unwrap();

        assert_eq!(options.correlation_id, id);
        assert_eq!(options.method, Method::POST);
        assert_eq!(options.url.path(), "/api/service");
        assert_eq!(options.headers["Accept"], "application/json");
        assert_eq!(options.body.as_deref(), Some("{\"id\":\"42\"}"));
        assert_eq!(options.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_from_template_rejects_bad_endpoint() {
        let err = RequestOptions::from_template(&template("GET", "not a url"), Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, ValidationError::Endpoint { .. }));
    }

    #[test]
    fn test_service_request_is_lenient() {
        let request: ServiceRequest = serde_json::from_str(r#"{"id":"abc"}"#).unwrap();
        assert_eq!(request.id.as_deref(), Some("abc"));
        assert!(request.headers.is_empty());

        let empty: ServiceRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, ServiceRequest::default());
    }
}
