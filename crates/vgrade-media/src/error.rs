//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while fetching or normalizing a source video.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("transcoder exited with {exit_code:?}: {stderr_tail}")]
    FfmpegFailed {
        stderr_tail: String,
        exit_code: Option<i32>,
    },

    #[error("transcoder exited cleanly but produced no output")]
    EmptyOutput,

    #[error("transcode exceeded its {0}s budget")]
    TranscodeTimeout(u64),

    #[error("source download exceeded its {0}s budget")]
    DownloadTimeout(u64),

    #[error("could not connect to source: {0}")]
    ConnectionFailed(String),

    #[error("source responded with HTTP {0}")]
    HttpStatus(u16),

    #[error("source download failed: {0}")]
    DownloadFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(stderr_tail: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::FfmpegFailed {
            stderr_tail: stderr_tail.into(),
            exit_code,
        }
    }

    /// Whether the caller can reasonably retry by resubmitting.
    ///
    /// A missing transcoder binary is an operator problem; everything on
    /// the network side is worth a retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            MediaError::TranscodeTimeout(_)
            | MediaError::DownloadTimeout(_)
            | MediaError::ConnectionFailed(_)
            | MediaError::DownloadFailed(_) => true,
            MediaError::HttpStatus(status) => *status >= 500,
            _ => false,
        }
    }
}
