//! HTTP service setup.
//!
//! # Responsibilities
//! - Create the Axum Router with the service and health handlers
//! - Wire up middleware (tracing, request ID, timeout)
//! - Guard the simulated work with the admission gate
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::http::request::{ServiceRequest, X_REQUEST_ID};
use crate::http::response::{format_retry_after, ServiceReply};
use crate::lifecycle::shutdown::stopped;
use crate::observability::metrics;
use crate::security::AdmissionGate;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AdmissionGate>,
    pub work_latency: Duration,
}

/// The overload-simulating service.
pub struct ServiceServer {
    router: Router,
    gate: Arc<AdmissionGate>,
}

impl ServiceServer {
    /// Create a server with a fresh gate sized from the configuration.
    pub fn new(config: ServiceConfig) -> Self {
        let gate = Arc::new(AdmissionGate::new(
            config.admission.capacity,
            Duration::from_secs(config.admission.retry_after_secs),
        ));
        Self::with_gate(config, gate)
    }

    /// Create a server around an existing gate.
    pub fn with_gate(config: ServiceConfig, gate: Arc<AdmissionGate>) -> Self {
        let state = AppState {
            gate: gate.clone(),
            work_latency: Duration::from_millis(config.admission.work_latency_ms),
        };
        let router = Self::build_router(&config, state);
        Self { router, gate }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                }),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .route("/api/service", post(service_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(middleware)
    }

    /// A clone of the router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }

    /// Serve connections from `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            capacity = self.gate.capacity(),
            retry_after_secs = self.gate.retry_after().as_secs(),
            "Service starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                stopped(shutdown).await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("Service stopped");
        Ok(())
    }
}

/// Admit the request or turn it away with a wait hint.
async fn service_handler(
    State(state): State<AppState>,
    Json(request): Json<ServiceRequest>,
) -> Response {
    let start = Instant::now();
    let id = request.id.unwrap_or_default();
    tracing::info!(id = %id, "Request received");

    let Some(permit) = state.gate.try_permit() else {
        let retry_after = state.gate.retry_after();
        tracing::info!(
            id = %id,
            retry_after_secs = retry_after.as_secs(),
            "Capacity exhausted, rejecting"
        );
        metrics::record_request(StatusCode::TOO_MANY_REQUESTS.as_u16(), start);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, format_retry_after(retry_after))],
            Json(ServiceReply { id }),
        )
            .into_response();
    };

    tokio::time::sleep(state.work_latency).await;
    drop(permit);

    tracing::info!(id = %id, elapsed_ms = start.elapsed().as_millis() as u64, "Request completed");
    metrics::record_request(StatusCode::OK.as_u16(), start);
    (StatusCode::OK, Json(ServiceReply { id })).into_response()
}

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    capacity: usize,
    available: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok",
        capacity: state.gate.capacity(),
        available: state.gate.available(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    fn server(capacity: usize) -> ServiceServer {
        let mut config = ServiceConfig::default();
        config.admission.capacity = capacity;
        config.admission.work_latency_ms = 10;
        ServiceServer::new(config)
    }

    fn post_service(id: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/service")
            .header(header::CONTENT_TYPE, "application/json")
            .header(X_REQUEST_ID, "client-supplied")
            .body(Body::from(format!(r#"{{"id":"{}"}}"#, id)))
            .unwrap()
    }

    async fn reply(response: Response) -> ServiceReply {
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_admitted_request_echoes_id() {
        let server = server(1);
        let response = server.router().oneshot(post_service("abc")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[X_REQUEST_ID], "client-supplied");
        assert_eq!(reply(response).await.id, "abc");
        assert_eq!(server.gate().available(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_gate_rejects_with_hint() {
        let server = server(1);
        let held = server.gate().try_permit().unwrap();

        let response = server.router().oneshot(post_service("xyz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "5");
        assert_eq!(reply(response).await.id, "xyz");

        drop(held);
        let response = server.router().oneshot(post_service("xyz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_reports_capacity() {
        let server = server(3);
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = server.router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["capacity"], 3);
        assert_eq!(body["available"], 3);
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/service")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let response = server(1).router().oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
