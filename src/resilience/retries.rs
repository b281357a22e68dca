//! Retry execution loop.
//!
//! # State Machine
//! ```text
//! Attempting → Succeeded                 (result not retryable)
//! Attempting → Exhausted                 (retryable, retry limit reached)
//! Attempting → Aborted                   (action failed, error not retryable)
//! Attempting → Waiting → Attempting      (retryable, retries left)
//! ```
//!
//! # Design Decisions
//! - The last obtained result is always surfaced; exhaustion never invents an error
//! - Transport errors abort unless the classifier opts in to retrying them
//! - Observer failures are logged and never stop the loop
//! - Waiting suspends only the calling task

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::observability::metrics;
use crate::resilience::backoff::{Backoff, BackoffPolicy, RetryConfig, ServerHint};

/// Error returned by a retry observer. Logged, never propagated.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Per-logical-request state threaded through every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptContext {
    correlation_id: Uuid,
    attempt: u32,
}

impl AttemptContext {
    pub fn new(correlation_id: Uuid) -> Self {
        Self {
            correlation_id,
            attempt: 0,
        }
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Number of retries scheduled so far (0 during the first attempt).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Seed for this request's private random source.
    pub fn seed(&self) -> u64 {
        let (hi, lo) = self.correlation_id.as_u64_pair();
        hi ^ lo
    }
}

/// Terminal outcome of one logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    /// The last result was not classified as retryable.
    Succeeded(T),
    /// Retries ran out while results were still retryable; carries the last one.
    Exhausted(T),
    /// The action failed and the failure was not retried (or retries ran out).
    Aborted(E),
}

impl<T, E> RetryOutcome<T, E> {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded(_))
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryOutcome::Exhausted(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, RetryOutcome::Aborted(_))
    }

    /// The final result, whether it succeeded or exhausted the retries.
    pub fn value(&self) -> Option<&T> {
        match self {
            RetryOutcome::Succeeded(v) | RetryOutcome::Exhausted(v) => Some(v),
            RetryOutcome::Aborted(_) => None,
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryOutcome::Succeeded(v) | RetryOutcome::Exhausted(v) => Ok(v),
            RetryOutcome::Aborted(e) => Err(e),
        }
    }
}

/// Decides which results (and optionally which errors) deserve another attempt.
///
/// Any `Fn(&T) -> bool` is a classifier that never retries errors.
pub trait RetryClassifier<T, E> {
    fn is_retryable(&self, result: &T) -> bool;

    fn is_retryable_error(&self, _error: &E) -> bool {
        false
    }
}

impl<T, E, F> RetryClassifier<T, E> for F
where
    F: Fn(&T) -> bool,
{
    fn is_retryable(&self, result: &T) -> bool {
        self(result)
    }
}

/// Whether connection-level failures are retried like retryable results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportErrorPolicy {
    /// Abort the logical request on the first transport error.
    #[default]
    Propagate,
    /// Retry transport errors under the active backoff policy.
    Retry,
}

impl From<bool> for TransportErrorPolicy {
    fn from(retry: bool) -> Self {
        if retry {
            TransportErrorPolicy::Retry
        } else {
            TransportErrorPolicy::Propagate
        }
    }
}

/// What triggered a retry.
#[derive(Debug)]
pub enum RetryCause<'a, T, E> {
    Result(&'a T),
    Error(&'a E),
}

/// Passed to the observer before every wait.
#[derive(Debug)]
pub struct RetryEvent<'a, T, E> {
    pub cause: RetryCause<'a, T, E>,
    pub delay: Duration,
    /// 1-based index of the retry about to be scheduled.
    pub attempt: u32,
    pub context: &'a AttemptContext,
}

/// Drives one logical request through its attempts.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: Arc<RetryConfig>,
    policy: BackoffPolicy,
}

impl RetryExecutor {
    pub fn new(config: Arc<RetryConfig>, policy: BackoffPolicy) -> Self {
        Self { config, policy }
    }

    /// Run `action` until the classifier accepts its result or retries run out.
    ///
    /// `on_retry` sees every retry decision before the wait begins.
    pub async fn execute<T, E, A, Fut, C, O>(
        &self,
        context: &mut AttemptContext,
        mut action: A,
        classifier: C,
        mut on_retry: O,
    ) -> RetryOutcome<T, E>
    where
        T: ServerHint,
        A: FnMut(&AttemptContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: RetryClassifier<T, E>,
        O: FnMut(&RetryEvent<'_, T, E>) -> Result<(), ObserverError>,
    {
        let retry_limit = self.policy.retry_limit(&self.config);
        let mut backoff = Backoff::new(self.policy, self.config.clone(), context.seed());

        loop {
            let delay = {
                let result = action(&*context).await;

                let retries_left = context.attempt < retry_limit;
                let cause = match &result {
                    Ok(value) if !classifier.is_retryable(value) => None,
                    Ok(value) if retries_left => Some(RetryCause::Result(value)),
                    Err(error) if retries_left && classifier.is_retryable_error(error) => {
                        Some(RetryCause::Error(error))
                    }
                    _ => None,
                };

                let Some(cause) = cause else {
                    return self.finish(context, result, &classifier);
                };

                context.attempt += 1;
                let hint: Option<&dyn ServerHint> = match &cause {
                    RetryCause::Result(value) => Some(*value),
                    RetryCause::Error(_) => None,
                };
                let delay = backoff.next_delay(context.attempt, hint);

                tracing::debug!(
                    correlation_id = %context.correlation_id,
                    attempt = context.attempt,
                    delay_ms = delay.as_millis() as u64,
                    policy = %self.policy,
                    "Scheduling retry"
                );
                metrics::record_retry(self.policy.name(), delay);

                let event = RetryEvent {
                    cause,
                    delay,
                    attempt: context.attempt,
                    context: &*context,
                };
                if let Err(e) = on_retry(&event) {
                    tracing::warn!(
                        correlation_id = %context.correlation_id,
                        attempt = context.attempt,
                        error = %e,
                        "Retry observer failed"
                    );
                }
                delay
            };

            tokio::time::sleep(delay).await;
        }
    }

    fn finish<T, E, C>(
        &self,
        context: &AttemptContext,
        result: Result<T, E>,
        classifier: &C,
    ) -> RetryOutcome<T, E>
    where
        C: RetryClassifier<T, E>,
    {
        match result {
            Ok(value) if classifier.is_retryable(&value) => {
                tracing::warn!(
                    correlation_id = %context.correlation_id,
                    retries = context.attempt,
                    "Retries exhausted"
                );
                RetryOutcome::Exhausted(value)
            }
            Ok(value) => {
                if context.attempt > 0 {
                    tracing::debug!(
                        correlation_id = %context.correlation_id,
                        retries = context.attempt,
                        "Request settled after retries"
                    );
                }
                RetryOutcome::Succeeded(value)
            }
            Err(error) => {
                tracing::debug!(
                    correlation_id = %context.correlation_id,
                    retries = context.attempt,
                    "Request aborted"
                );
                RetryOutcome::Aborted(error)
            }
        }
    }
}

/// Default HTTP rule: 408, 429 and every 5xx are transient.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429) || status >= 500
}
