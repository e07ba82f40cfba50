//! REST record-store client.
//!
//! Talks to a PostgREST-style endpoint: point reads filter on the id
//! column, partial updates go out as PATCH bodies containing exactly the
//! fields being written. The store applies only those columns, which
//! gives the field-scoped update semantics the concurrent phases rely on.

use async_trait::async_trait;
use metrics::counter;
use reqwest::StatusCode;
use tracing::{debug, info};

use vgrade_models::{GradingJob, JobPatch, ScanId};

use crate::error::{StoreError, StoreResult};
use crate::store::JobStore;

const JOBS_TABLE: &str = "grading_jobs";

/// Client for the hosted record store.
#[derive(Clone)]
pub struct RestJobStore {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl RestJobStore {
    /// Create a client against an explicit endpoint.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from `VGRADE_STORE_URL` / `VGRADE_STORE_KEY`.
    pub fn from_env() -> StoreResult<Self> {
        let base_url = std::env::var("VGRADE_STORE_URL")
            .map_err(|_| StoreError::config("VGRADE_STORE_URL not set"))?;
        let api_key = std::env::var("VGRADE_STORE_KEY")
            .map_err(|_| StoreError::config("VGRADE_STORE_KEY not set"))?;
        Ok(Self::new(base_url, api_key))
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, JOBS_TABLE)
    }

    fn row_url(&self, id: &ScanId) -> String {
        format!(
            "{}?id=eq.{}",
            self.table_url(),
            urlencoding::encode(id.as_str())
        )
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn error_from_response(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let excerpt: String = body.chars().take(200).collect();
        StoreError::RequestFailed {
            status,
            body: excerpt,
        }
    }
}

#[async_trait]
impl JobStore for RestJobStore {
    async fn create(&self, job: &GradingJob) -> StoreResult<()> {
        let response = self
            .authed(self.client.post(self.table_url()))
            .header("Prefer", "return=minimal")
            .json(job)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {
                counter!("store_job_created_total").increment(1);
                info!(scan_id = %job.id, "created job record");
                Ok(())
            }
            StatusCode::CONFLICT => Err(StoreError::AlreadyExists(job.id.to_string())),
            _ => Err(Self::error_from_response(response).await),
        }
    }

    async fn get(&self, id: &ScanId) -> StoreResult<Option<GradingJob>> {
        let response = self
            .authed(self.client.get(self.row_url(id)))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let mut rows: Vec<GradingJob> = response.json().await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    async fn patch(&self, id: &ScanId, patch: &JobPatch) -> StoreResult<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let response = self
            .authed(self.client.patch(self.row_url(id)))
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        counter!("store_job_patched_total").increment(1);
        debug!(scan_id = %id, "patched job record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgrade_models::{ItemType, JobStatus};
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn job() -> GradingJob {
        GradingJob::new(
            ScanId::from_string("scan-test"),
            "https://example.com/v.mp4",
            ItemType::Card,
        )
    }

    #[tokio::test]
    async fn test_create_posts_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/grading_jobs"))
            .and(header("apikey", "k"))
            .and(body_partial_json(serde_json::json!({"id": "scan-test"})))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let store = RestJobStore::new(server.uri(), "k");
        store.create(&job()).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_conflict_maps_to_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let store = RestJobStore::new(server.uri(), "k");
        let err = store.create(&job()).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_get_reads_single_row() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/grading_jobs"))
            .and(query_param("id", "eq.scan-test"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([serde_json::to_value(job()).unwrap()])),
            )
            .mount(&server)
            .await;

        let store = RestJobStore::new(server.uri(), "k");
        let fetched = store.get(&ScanId::from_string("scan-test")).await.unwrap();
        assert_eq!(fetched.unwrap().id.as_str(), "scan-test");
    }

    #[tokio::test]
    async fn test_get_missing_row_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let store = RestJobStore::new(server.uri(), "k");
        assert!(store
            .get(&ScanId::from_string("scan-missing"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_patch_sends_only_set_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/grading_jobs"))
            .and(query_param("id", "eq.scan-test"))
            .and(body_partial_json(serde_json::json!({"status": "processing"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let store = RestJobStore::new(server.uri(), "k");
        store
            .patch(
                &ScanId::from_string("scan-test"),
                &JobPatch::status(JobStatus::Processing),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_patch_is_a_noop() {
        let server = MockServer::start().await;
        // No mock mounted: a request would 404 and fail the call.
        let store = RestJobStore::new(server.uri(), "k");
        store
            .patch(&ScanId::from_string("scan-test"), &JobPatch::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let store = RestJobStore::new(server.uri(), "k");
        let err = store
            .get(&ScanId::from_string("scan-test"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
