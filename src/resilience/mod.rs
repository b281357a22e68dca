//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Logical request:
//!     → retries.rs (invoke action, classify result)
//!     → On retryable result: backoff.rs (compute the wait for this attempt)
//!     → observer hook, sleep, try again
//! ```
//!
//! # Design Decisions
//! - Policies form a closed enum; adding one is a compile-checked match arm
//! - Every logical request owns its backoff state and random source
//! - Jittered and decorrelated policies keep simultaneous retries apart

pub mod backoff;
pub mod retries;

pub use backoff::{Backoff, BackoffPolicy, RetryConfig, ServerHint, UnknownPolicy};
pub use retries::{
    is_retryable_status, AttemptContext, ObserverError, RetryCause, RetryClassifier, RetryEvent,
    RetryExecutor, RetryOutcome, TransportErrorPolicy,
};
