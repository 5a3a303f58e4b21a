//! Per-run bookkeeping for the tracker pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Counts of what happened to each requested ticker during one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Tickers requested from the quote source
    pub requested: usize,
    /// Fetch calls that failed outright
    pub fetch_failed: usize,
    /// Series too short or with a zero previous close
    pub dropped: usize,
    /// Quotes with no mapping entry
    pub unmapped: usize,
    /// Records that made it into the report
    pub reported: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunStats {
    pub fn success_rate(&self) -> f64 {
        if self.requested == 0 {
            0.0
        } else {
            (self.reported as f64 / self.requested as f64) * 100.0
        }
    }

    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            requested = self.requested,
            fetch_failed = self.fetch_failed,
            dropped = self.dropped,
            unmapped = self.unmapped,
            reported = self.reported,
            success_rate = %format!("{:.1}%", self.success_rate()),
            elapsed = %format!("{:.1}s", self.elapsed.as_secs_f64()),
            "Run complete"
        );
    }
}
