//! CV worker client error types.

use thiserror::Error;

/// Result type for CV worker operations.
pub type CvResult<T> = Result<T, CvClientError>;

/// Errors from the remote CV worker.
#[derive(Debug, Error)]
pub enum CvClientError {
    #[error("CV worker configuration error: {0}")]
    Config(String),

    #[error("CV analysis exceeded its {0}s budget")]
    Timeout(u64),

    #[error("CV worker returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("CV worker request failed: {0}")]
    Network(String),

    #[error("invalid CV worker response: {0}")]
    InvalidResponse(String),
}

impl CvClientError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            CvClientError::Timeout(_) | CvClientError::Network(_) => true,
            CvClientError::Service { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
