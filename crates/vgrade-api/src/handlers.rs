//! HTTP handlers for the grading API.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use validator::Validate;

use vgrade_models::{GradingJob, ItemType, JobStatus, ProgressSnapshot, ScanId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Request body for submitting a scan.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitScanRequest {
    /// Fetchable location of the captured video
    #[validate(url(message = "video_url must be a valid URL"))]
    pub video_url: String,

    /// Kind of collectible
    #[serde(default)]
    pub item_type: ItemType,

    /// Caller-supplied scan id, for idempotent resubmission
    pub scan_id: Option<String>,
}

/// Response for a submitted scan.
#[derive(Debug, Serialize)]
pub struct SubmitScanResponse {
    pub scan_id: ScanId,
    pub status: JobStatus,
}

/// Submit a video for grading.
///
/// Creates the job record and fans the two analysis phases out on the
/// runtime. The response returns immediately; callers follow progress
/// through the status endpoint.
pub async fn submit_scan(
    State(state): State<AppState>,
    Json(request): Json<SubmitScanRequest>,
) -> ApiResult<(StatusCode, Json<SubmitScanResponse>)> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let id = match request.scan_id {
        Some(id) if !id.trim().is_empty() => ScanId::from_string(id),
        _ => ScanId::new(),
    };

    let job = GradingJob::new(id.clone(), request.video_url, request.item_type);

    match state.store.create(&job).await {
        Ok(()) => {}
        Err(vgrade_store::StoreError::AlreadyExists(_)) => {
            return Err(ApiError::Conflict(format!("scan {} already exists", id)));
        }
        Err(e) => return Err(e.into()),
    }

    info!(scan_id = %id, "scan submitted");

    let executor = state.executor.clone();
    let spawned_id = id.clone();
    tokio::spawn(async move {
        if let Err(e) = executor.run(job).await {
            error!(scan_id = %spawned_id, "grading job ended in failure: {}", e);
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitScanResponse {
            scan_id: id,
            status: JobStatus::Pending,
        }),
    ))
}

/// Fetch the full job record.
pub async fn get_scan(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> ApiResult<Json<GradingJob>> {
    let job = state
        .store
        .get(&ScanId::from_string(scan_id.as_str()))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("scan {}", scan_id)))?;
    Ok(Json(job))
}

/// Poll the progress contract for a job.
pub async fn get_scan_status(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> ApiResult<Json<ProgressSnapshot>> {
    let job = state
        .store
        .get(&ScanId::from_string(scan_id.as_str()))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("scan {}", scan_id)))?;
    Ok(Json(ProgressSnapshot::from(&job)))
}

/// Liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
