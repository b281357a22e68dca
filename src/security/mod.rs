//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → admission.rs (reserve a capacity slot or reject with a wait hint)
//!     → simulated work, outside the gate's lock
//!     → permit dropped, slot returned
//! ```
//!
//! # Design Decisions
//! - Fail fast: a full gate answers 429 immediately instead of queuing
//! - The gate is an owned instance injected into handler state, never a static

pub mod admission;

pub use admission::{AdmissionDecision, AdmissionGate, AdmissionPermit};
