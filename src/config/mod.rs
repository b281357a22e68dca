//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! service.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!
//! appsettings.json (raw text, read once)
//!     → loader.rs render_settings: "{{ id }}" → correlation id, per request
//!     → validation.rs
//!     → ClientSettings → RetryConfig + RequestOptions
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All service fields have defaults to allow minimal configs
//! - Token substitution happens on text, before deserialization

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigError, ID_TOKEN};
pub use schema::{
    AdmissionConfig, ClientSettings, ListenerConfig, LogFormat, ObservabilityConfig,
    RequestTemplate, RetryOptions, ServiceConfig, TimeoutConfig,
};
