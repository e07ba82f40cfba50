//! In-memory job store.
//!
//! Same patch semantics as the REST client, backed by a map. Used by the
//! test suites and by single-process deployments that do not need a
//! hosted record store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use vgrade_models::{GradingJob, JobPatch, ScanId};

use crate::error::{StoreError, StoreResult};
use crate::store::JobStore;

/// Map-backed [`JobStore`].
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<RwLock<HashMap<String, GradingJob>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: &GradingJob) -> StoreResult<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(job.id.as_str()) {
            return Err(StoreError::AlreadyExists(job.id.to_string()));
        }
        jobs.insert(job.id.to_string(), job.clone());
        Ok(())
    }

    async fn get(&self, id: &ScanId) -> StoreResult<Option<GradingJob>> {
        Ok(self.jobs.read().await.get(id.as_str()).cloned())
    }

    async fn patch(&self, id: &ScanId, patch: &JobPatch) -> StoreResult<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;
        job.apply_patch(patch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgrade_models::{ItemType, JobStatus};

    fn job(id: &str) -> GradingJob {
        GradingJob::new(
            ScanId::from_string(id),
            "https://example.com/v.mp4",
            ItemType::Toy,
        )
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemoryJobStore::new();
        store.create(&job("scan-1")).await.unwrap();

        let fetched = store.get(&ScanId::from_string("scan-1")).await.unwrap();
        assert_eq!(fetched.unwrap().status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let store = MemoryJobStore::new();
        store.create(&job("scan-1")).await.unwrap();
        let err = store.create(&job("scan-1")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_patch_missing_record() {
        let store = MemoryJobStore::new();
        let err = store
            .patch(
                &ScanId::from_string("scan-x"),
                &JobPatch::status(JobStatus::Processing),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_disjoint_patches_both_land() {
        let store = MemoryJobStore::new();
        store.create(&job("scan-1")).await.unwrap();
        let id = ScanId::from_string("scan-1");

        // One writer sets status, the other progress; neither is lost.
        let s1 = store.clone();
        let s2 = store.clone();
        let id1 = id.clone();
        let id2 = id.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move {
                s1.patch(&id1, &JobPatch::status(JobStatus::Processing)).await
            }),
            tokio::spawn(async move {
                s2.patch(&id2, &JobPatch::progress(30, "frames", "extracting frames"))
                    .await
            }),
        );
        a.unwrap().unwrap();
        b.unwrap().unwrap();

        let fetched = store.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Processing);
        assert_eq!(fetched.progress_percentage, 30);
    }
}
