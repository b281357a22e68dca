//! Retry client subsystem.
//!
//! # Data Flow
//! ```text
//! appsettings.json (raw text)
//!     → driver.rs (one task per logical request, fresh correlation id)
//!     → resilience::RetryExecutor
//!     → service_client.rs (one HTTP attempt)
//!     → observability::telemetry (one record per scheduled retry)
//! ```

pub mod driver;
pub mod service_client;

pub use driver::{Driver, DriverError, DriverReport};
pub use service_client::{ClientError, HttpClassifier, ServiceClient, ServiceResponse};
