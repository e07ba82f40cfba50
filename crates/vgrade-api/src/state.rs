//! Application state.

use std::sync::Arc;

use tracing::warn;

use vgrade_cv::CvWorkerClient;
use vgrade_media::{NormalizerConfig, VideoNormalizer};
use vgrade_store::{JobStore, MemoryJobStore, RestJobStore};
use vgrade_vision::VisionClient;
use vgrade_worker::{GradingContext, GradingExecutor, WorkerConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn JobStore>,
    pub executor: GradingExecutor,
}

impl AppState {
    /// Create new application state from the environment.
    pub fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        // A hosted record store when configured; the in-process store
        // otherwise, which is enough for a single-instance deployment.
        let store: Arc<dyn JobStore> = if std::env::var("VGRADE_STORE_URL").is_ok() {
            Arc::new(RestJobStore::from_env()?)
        } else {
            warn!("VGRADE_STORE_URL not set; using the in-memory job store");
            Arc::new(MemoryJobStore::new())
        };

        let vision = Arc::new(VisionClient::from_env()?);
        let cv = Arc::new(CvWorkerClient::from_env()?);
        let normalizer = Arc::new(VideoNormalizer::new(NormalizerConfig::from_env()));

        let ctx = GradingContext::new(
            store.clone(),
            vision,
            cv,
            normalizer,
            WorkerConfig::from_env(),
        );

        Ok(Self {
            config,
            store,
            executor: GradingExecutor::new(ctx),
        })
    }

    /// Build state around explicit components (tests).
    pub fn with_components(
        config: ApiConfig,
        store: Arc<dyn JobStore>,
        executor: GradingExecutor,
    ) -> Self {
        Self {
            config,
            store,
            executor,
        }
    }
}
