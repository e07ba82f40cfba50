//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Normalize the source video before the initial AI pass. When off
    /// (or when normalization fails transiently), the vision API gets
    /// the raw source URL instead of inline bytes.
    pub normalize_before_analysis: bool,
    /// Maximum golden frames downloaded for re-verification, however
    /// many the CV worker returned. Bounds the inference payload.
    pub max_reverify_frames: usize,
    /// Budget per golden-frame download
    pub frame_download_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            normalize_before_analysis: true,
            max_reverify_frames: 4,
            frame_download_timeout: Duration::from_secs(30),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            normalize_before_analysis: std::env::var("VGRADE_NORMALIZE_BEFORE_ANALYSIS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.normalize_before_analysis),
            max_reverify_frames: std::env::var("VGRADE_MAX_REVERIFY_FRAMES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_reverify_frames),
            frame_download_timeout: Duration::from_secs(
                std::env::var("VGRADE_FRAME_DOWNLOAD_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.frame_download_timeout.as_secs()),
            ),
        }
    }
}
