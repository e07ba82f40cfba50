//! The job store interface.

use async_trait::async_trait;

use vgrade_models::{GradingJob, JobPatch, ScanId};

use crate::error::StoreResult;

/// Keyed access to grading job records.
///
/// Implementations must provide point reads by id and atomic field-scoped
/// partial updates: a patch writes only the fields it carries, so two
/// phases updating disjoint field sets never lose each other's writes.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job record. Fails if the id already exists.
    async fn create(&self, job: &GradingJob) -> StoreResult<()>;

    /// Point read by id.
    async fn get(&self, id: &ScanId) -> StoreResult<Option<GradingJob>>;

    /// Apply a field-scoped partial update to an existing record.
    async fn patch(&self, id: &ScanId, patch: &JobPatch) -> StoreResult<()>;
}
