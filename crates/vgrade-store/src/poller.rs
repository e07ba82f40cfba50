//! Progress polling with bounded failure tolerance.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use vgrade_models::{ProgressSnapshot, ScanId};

use crate::error::{StoreError, StoreResult};
use crate::store::JobStore;

/// Polls a job record on a fixed interval until it reaches a terminal
/// state, giving up after a bounded run of consecutive read failures
/// rather than polling forever.
pub struct ProgressPoller {
    store: Arc<dyn JobStore>,
    interval: Duration,
    max_consecutive_failures: u32,
}

impl ProgressPoller {
    pub fn new(store: Arc<dyn JobStore>, interval: Duration, max_consecutive_failures: u32) -> Self {
        Self {
            store,
            interval,
            max_consecutive_failures,
        }
    }

    /// Read the current progress snapshot once.
    pub async fn poll_once(&self, id: &ScanId) -> StoreResult<ProgressSnapshot> {
        let job = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;
        Ok(ProgressSnapshot::from(&job))
    }

    /// Poll until the job reaches a terminal state.
    ///
    /// Consecutive read failures are tolerated up to the configured bound;
    /// a successful read resets the count. The failure that exhausts the
    /// bound is returned to the caller.
    pub async fn wait_for_terminal(&self, id: &ScanId) -> StoreResult<ProgressSnapshot> {
        let mut consecutive_failures = 0u32;

        loop {
            match self.poll_once(id).await {
                Ok(snapshot) => {
                    consecutive_failures = 0;
                    debug!(
                        scan_id = %id,
                        status = %snapshot.status,
                        progress = snapshot.progress_percentage,
                        "poll"
                    );
                    if snapshot.is_terminal() {
                        return Ok(snapshot);
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    warn!(
                        scan_id = %id,
                        failures = consecutive_failures,
                        "progress read failed: {}",
                        e
                    );
                    if consecutive_failures >= self.max_consecutive_failures {
                        return Err(e);
                    }
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryJobStore;
    use vgrade_models::{GradingJob, ItemType, JobPatch, JobStatus};

    #[tokio::test]
    async fn test_wait_for_terminal_observes_completion() {
        let store = Arc::new(MemoryJobStore::new());
        let id = ScanId::from_string("scan-1");
        store
            .create(&GradingJob::new(
                id.clone(),
                "https://example.com/v.mp4",
                ItemType::Card,
            ))
            .await
            .unwrap();

        let poller = ProgressPoller::new(store.clone(), Duration::from_millis(5), 3);

        let writer = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                let mut patch = JobPatch::status(JobStatus::Complete);
                patch.final_grade = Some(8.5);
                store.patch(&id, &patch).await.unwrap();
            })
        };

        let snapshot = poller.wait_for_terminal(&id).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Complete);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_poller_gives_up_after_bounded_failures() {
        // Store with no such record: every read is a failure.
        let store = Arc::new(MemoryJobStore::new());
        let poller = ProgressPoller::new(store, Duration::from_millis(1), 3);

        let err = poller
            .wait_for_terminal(&ScanId::from_string("scan-void"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
