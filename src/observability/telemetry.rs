//! Retry telemetry.
//!
//! Every scheduled retry appends one [`RetryRecord`]; at the end of a run the
//! records are exported as CSV for offline comparison of backoff policies.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// One retry decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryRecord {
    pub correlation_id: Uuid,
    pub wait_duration_seconds: f64,
}

impl RetryRecord {
    pub fn new(correlation_id: Uuid, wait: Duration) -> Self {
        Self {
            correlation_id,
            wait_duration_seconds: wait.as_secs_f64(),
        }
    }
}

/// Append-only record store shared by concurrent requests.
#[derive(Debug, Default)]
pub struct TelemetrySink {
    records: Mutex<Vec<RetryRecord>>,
}

impl TelemetrySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, record: RetryRecord) {
        self.lock().push(record);
    }

    /// Copy of every record, in append order.
    pub fn snapshot(&self) -> Vec<RetryRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RetryRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Error type for telemetry export.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Write `records` to `path` as CSV, creating the parent directory if needed.
pub fn write_csv(path: &Path, records: &[RetryRecord]) -> Result<(), TelemetryError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), records = records.len(), "Telemetry written");
    Ok(())
}
