//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → request.rs (lenient JSON descriptor)
//!     → security::admission (reserve a slot or reject)
//!     → response.rs (reply body, Retry-After hint)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestOptions, ServiceRequest, X_REQUEST_ID};
pub use response::{format_retry_after, parse_retry_after, ServiceReply};
pub use server::{AppState, ServiceServer};
