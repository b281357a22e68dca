//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! The retry client additionally produces:
//!     → telemetry.rs (one record per scheduled retry, exported as CSV)
//! ```
//!
//! # Design Decisions
//! - Correlation ID flows through client logs, `x-request-id` and server logs
//! - Metrics are cheap (no-op without an installed recorder)

pub mod logging;
pub mod metrics;
pub mod telemetry;
