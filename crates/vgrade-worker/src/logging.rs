//! Structured job logging utilities.

use tracing::{error, info, warn, Span};
use vgrade_models::ScanId;

/// Job logger for structured logging with consistent formatting.
///
/// Carries the scan id and operation name so every lifecycle event lands
/// in the logs with the same contextual fields.
#[derive(Debug, Clone)]
pub struct JobLogger {
    scan_id: String,
    operation: String,
}

impl JobLogger {
    /// Create a new job logger for a specific scan and operation.
    pub fn new(scan_id: &ScanId, operation: &str) -> Self {
        Self {
            scan_id: scan_id.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Log the start of a job operation.
    pub fn log_start(&self, message: &str) {
        info!(
            scan_id = %self.scan_id,
            operation = %self.operation,
            "Job started: {}", message
        );
    }

    /// Log a progress update during job execution.
    pub fn log_progress(&self, message: &str) {
        info!(
            scan_id = %self.scan_id,
            operation = %self.operation,
            "Job progress: {}", message
        );
    }

    /// Log a warning during job execution.
    pub fn log_warning(&self, message: &str) {
        warn!(
            scan_id = %self.scan_id,
            operation = %self.operation,
            "Job warning: {}", message
        );
    }

    /// Log an error during job execution.
    pub fn log_error(&self, message: &str) {
        error!(
            scan_id = %self.scan_id,
            operation = %self.operation,
            "Job error: {}", message
        );
    }

    /// Log the completion of a job operation.
    pub fn log_completion(&self, message: &str) {
        info!(
            scan_id = %self.scan_id,
            operation = %self.operation,
            "Job completed: {}", message
        );
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            scan_id = %self.scan_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let scan_id = ScanId::new();
        let logger = JobLogger::new(&scan_id, "initial_analysis");
        assert_eq!(logger.scan_id, scan_id.to_string());
        assert_eq!(logger.operation, "initial_analysis");
    }
}
