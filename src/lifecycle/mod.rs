//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → wait_for_signal resolves
//!
//! Shutdown (shutdown.rs):
//!     trigger → latched flag → every subscribed server stops accepting → in-flight work drains
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::{stopped, Shutdown};
pub use signals::wait_for_signal;
