//! Shared dependencies for the grading phases.

use std::sync::Arc;

use vgrade_cv::CvWorkerClient;
use vgrade_media::VideoNormalizer;
use vgrade_store::JobStore;
use vgrade_vision::VisionClient;

use crate::config::WorkerConfig;

/// Everything a grading phase needs: store handle, remote clients, the
/// normalizer, and the worker knobs. One context serves all jobs; per-job
/// state lives in the job record.
#[derive(Clone)]
pub struct GradingContext {
    pub store: Arc<dyn JobStore>,
    pub vision: Arc<VisionClient>,
    pub cv: Arc<CvWorkerClient>,
    pub normalizer: Arc<VideoNormalizer>,
    pub config: WorkerConfig,
    /// Plain HTTP client for golden-frame downloads
    pub http: reqwest::Client,
}

impl GradingContext {
    pub fn new(
        store: Arc<dyn JobStore>,
        vision: Arc<VisionClient>,
        cv: Arc<CvWorkerClient>,
        normalizer: Arc<VideoNormalizer>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            vision,
            cv,
            normalizer,
            config,
            http: reqwest::Client::new(),
        }
    }
}
