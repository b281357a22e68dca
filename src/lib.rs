//! Retry storm lab: backoff policies, a retry executor, and a service that
//! sheds load with `429` and a `Retry-After` hint.

pub mod client;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use client::{Driver, DriverReport, ServiceClient};
pub use config::{ClientSettings, ServiceConfig};
pub use http::ServiceServer;
pub use lifecycle::Shutdown;
pub use resilience::{BackoffPolicy, RetryConfig, RetryExecutor, RetryOutcome};
pub use security::AdmissionGate;
