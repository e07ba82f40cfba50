//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("job failed: {0}")]
    JobFailed(String),

    #[error("media error: {0}")]
    Media(#[from] vgrade_media::MediaError),

    #[error("store error: {0}")]
    Store(#[from] vgrade_store::StoreError),

    #[error("vision error: {0}")]
    Vision(#[from] vgrade_vision::VisionError),

    #[error("CV worker error: {0}")]
    Cv(#[from] vgrade_cv::CvClientError),
}

/// What kind of fix the surfaced failure needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Operator-fixable: credentials, endpoints, missing binaries
    Configuration,
    /// Retry-fixable: timeouts and upstream hiccups
    Transient,
    /// Input-fixable: the submitted video itself is unusable
    UnsupportedInput,
    /// Everything else
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Configuration => "configuration problem",
            FailureKind::Transient => "transient failure",
            FailureKind::UnsupportedInput => "unsupported input",
            FailureKind::Internal => "internal error",
        }
    }
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    /// Check if error is a configuration problem the operator must fix.
    pub fn is_config(&self) -> bool {
        matches!(self.failure_kind(), FailureKind::Configuration)
    }

    /// Check if error is retryable by resubmitting the job.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Media(e) => e.is_retryable(),
            WorkerError::Store(e) => e.is_retryable(),
            WorkerError::Vision(e) => e.is_retryable(),
            WorkerError::Cv(e) => e.is_retryable(),
            WorkerError::JobFailed(_) => false,
        }
    }

    /// Classify the failure for caller-facing messaging.
    pub fn failure_kind(&self) -> FailureKind {
        use vgrade_media::MediaError;

        match self {
            WorkerError::Media(MediaError::FfmpegNotFound) => FailureKind::Configuration,
            WorkerError::Media(MediaError::HttpStatus(status)) if *status < 500 => {
                FailureKind::UnsupportedInput
            }
            WorkerError::Media(MediaError::FfmpegFailed { .. })
            | WorkerError::Media(MediaError::EmptyOutput) => FailureKind::UnsupportedInput,
            WorkerError::Store(vgrade_store::StoreError::Config(_))
            | WorkerError::Vision(vgrade_vision::VisionError::Config(_))
            | WorkerError::Vision(vgrade_vision::VisionError::NotFound(_))
            | WorkerError::Cv(vgrade_cv::CvClientError::Config(_)) => FailureKind::Configuration,
            e if e.is_retryable() => FailureKind::Transient,
            _ => FailureKind::Internal,
        }
    }

    /// Caller-facing message naming the failure category.
    pub fn surface_message(&self) -> String {
        format!("{}: {}", self.failure_kind().as_str(), self)
    }
}
