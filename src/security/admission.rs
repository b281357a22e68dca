//! Admission control for the simulated backend.
//!
//! A bounded pool of in-flight slots guarded by one mutex. The lock covers
//! only the check-and-decrement (or increment); the admitted work itself runs
//! outside it. This caps concurrency, not request rate.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::observability::metrics;

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Accepted,
    /// No capacity left; the caller should come back after `retry_after`.
    Rejected { retry_after: Duration },
}

/// Tracks how many units of work may still start.
#[derive(Debug)]
pub struct AdmissionGate {
    available: Mutex<usize>,
    capacity: usize,
    retry_after: Duration,
}

impl AdmissionGate {
    /// Create a gate with every slot free.
    pub fn new(capacity: usize, retry_after: Duration) -> Self {
        Self {
            available: Mutex::new(capacity),
            capacity,
            retry_after,
        }
    }

    /// Reserve a slot if one is free. Never blocks on capacity.
    pub fn try_admit(&self) -> AdmissionDecision {
        let (decision, remaining) = {
            let mut available = self.lock();
            if *available == 0 {
                let rejected = AdmissionDecision::Rejected {
                    retry_after: self.retry_after,
                };
                (rejected, 0)
            } else {
                *available -= 1;
                (AdmissionDecision::Accepted, *available)
            }
        };

        metrics::record_admission(decision == AdmissionDecision::Accepted);
        metrics::record_capacity(remaining);
        decision
    }

    /// Return a slot reserved by [`try_admit`](Self::try_admit).
    pub fn release(&self) {
        let restored = {
            let mut available = self.lock();
            if *available < self.capacity {
                *available += 1;
                Some(*available)
            } else {
                None
            }
        };

        match restored {
            Some(available) => metrics::record_capacity(available),
            None => tracing::warn!(
                capacity = self.capacity,
                "Release without matching admission ignored"
            ),
        }
    }

    /// Reserve a slot and tie its release to the returned permit.
    pub fn try_permit(self: &Arc<Self>) -> Option<AdmissionPermit> {
        match self.try_admit() {
            AdmissionDecision::Accepted => Some(AdmissionPermit { gate: self.clone() }),
            AdmissionDecision::Rejected { .. } => None,
        }
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        *self.lock()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wait hint handed to rejected callers.
    pub fn retry_after(&self) -> Duration {
        self.retry_after
    }

    // The guarded value is a plain counter that is never left half-updated.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.available.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A RAII guard that gives its slot back to the gate on drop.
#[derive(Debug)]
pub struct AdmissionPermit {
    gate: Arc<AdmissionGate>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}
