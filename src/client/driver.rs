//! Concurrent load driver.
//!
//! # Responsibilities
//! - Spawn one task per logical request, each with its own correlation id
//! - Render the settings template, then run the request through the executor
//! - Record every scheduled retry into the shared telemetry sink
//! - Aggregate outcomes into a [`DriverReport`]

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use uuid::Uuid;

use crate::client::service_client::{ClientError, HttpClassifier, ServiceClient, ServiceResponse};
use crate::config::loader::render_settings;
use crate::config::ConfigError;
use crate::http::RequestOptions;
use crate::observability::telemetry::{RetryRecord, TelemetrySink};
use crate::resilience::{
    AttemptContext, BackoffPolicy, RetryCause, RetryConfig, RetryEvent, RetryExecutor,
    RetryOutcome,
};

/// Error type for a driver run.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request task failed: {0}")]
    Task(#[from] JoinError),
}

/// Aggregate result of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverReport {
    pub requests: usize,
    pub succeeded: usize,
    pub exhausted: usize,
    pub aborted: usize,
    /// Retries scheduled across all requests.
    pub retries: u64,
    pub elapsed: Duration,
}

/// Fans logical requests out through the retry executor.
pub struct Driver {
    client: ServiceClient,
    raw_settings: Arc<str>,
    policy: BackoffPolicy,
    sink: Arc<TelemetrySink>,
}

impl Driver {
    /// `raw_settings` is the unrendered settings document.
    pub fn new(client: ServiceClient, raw_settings: impl Into<Arc<str>>, policy: BackoffPolicy) -> Self {
        Self {
            client,
            raw_settings: raw_settings.into(),
            policy,
            sink: Arc::new(TelemetrySink::new()),
        }
    }

    /// Telemetry gathered so far.
    pub fn sink(&self) -> &Arc<TelemetrySink> {
        &self.sink
    }

    /// Run `requests` logical requests concurrently and wait for all of them.
    ///
    /// A settings document that fails to render aborts the whole run.
    pub async fn run(&self, requests: usize) -> Result<DriverReport, DriverError> {
        let start = Instant::now();
        tracing::info!(requests, policy = %self.policy, "Run starting");

        let mut tasks = JoinSet::new();
        for _ in 0..requests {
            let client = self.client.clone();
            let raw = self.raw_settings.clone();
            let sink = self.sink.clone();
            let policy = self.policy;
            tasks.spawn(async move { run_request(client, raw, policy, sink).await });
        }

        let mut report = DriverReport {
            requests,
            ..DriverReport::default()
        };
        while let Some(joined) = tasks.join_next().await {
            let (outcome, retries) = joined??;
            report.retries += u64::from(retries);
            match outcome {
                RetryOutcome::Succeeded(_) => report.succeeded += 1,
                RetryOutcome::Exhausted(_) => report.exhausted += 1,
                RetryOutcome::Aborted(e) => {
                    tracing::warn!(error = %e, "Request aborted");
                    report.aborted += 1;
                }
            }
        }
        report.elapsed = start.elapsed();

        tracing::info!(
            requests = report.requests,
            succeeded = report.succeeded,
            exhausted = report.exhausted,
            aborted = report.aborted,
            retries = report.retries,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Run finished"
        );
        Ok(report)
    }
}

type RequestResult = (RetryOutcome<ServiceResponse, ClientError>, u32);

async fn run_request(
    client: ServiceClient,
    raw: Arc<str>,
    policy: BackoffPolicy,
    sink: Arc<TelemetrySink>,
) -> Result<RequestResult, ConfigError> {
    let correlation_id = Uuid::new_v4();
    let settings = render_settings(&raw, &correlation_id)?;
    let config = Arc::new(RetryConfig::try_from(&settings.retry)?);
    let options = RequestOptions::from_template(&settings.request, correlation_id)
        .map_err(|e| ConfigError::Validation(vec![e]))?;
    let classifier = HttpClassifier::new(settings.retry.retry_transport_errors.into());

    let mut context = AttemptContext::new(correlation_id);
    let outcome = RetryExecutor::new(config, policy)
        .execute(
            &mut context,
            |_| client.send(&options),
            classifier,
            |event: &RetryEvent<'_, ServiceResponse, ClientError>| {
                sink.record(RetryRecord::new(event.context.correlation_id(), event.delay));
                match &event.cause {
                    RetryCause::Result(response) => tracing::info!(
                        correlation_id = %event.context.correlation_id(),
                        attempt = event.attempt,
                        delay_ms = event.delay.as_millis() as u64,
                        status = response.status,
                        "Request will retry"
                    ),
                    RetryCause::Error(error) => tracing::info!(
                        correlation_id = %event.context.correlation_id(),
                        attempt = event.attempt,
                        delay_ms = event.delay.as_millis() as u64,
                        error = %error,
                        "Request will retry"
                    ),
                }
                Ok(())
            },
        )
        .await;

    Ok((outcome, context.attempt()))
}
