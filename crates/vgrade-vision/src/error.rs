//! Vision client error types.

use thiserror::Error;

use crate::json_extract::JsonExtractError;

/// Result type for vision operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// Errors from the vision-language inference API.
///
/// Callers differentiate retry strategy by variant: timeouts are worth a
/// resubmission, service errors may clear on their own, configuration and
/// not-found errors need an operator.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("vision configuration error: {0}")]
    Config(String),

    #[error("vision inference exceeded its {0}s budget")]
    Timeout(u64),

    #[error("vision API returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("vision model or route not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Parse(#[from] JsonExtractError),

    #[error("invalid vision request: {0}")]
    Validation(String),

    #[error("vision request failed: {0}")]
    Network(String),
}

impl VisionError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            VisionError::Timeout(_) | VisionError::Network(_) => true,
            VisionError::Service { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
