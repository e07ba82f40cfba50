//! HTTP client for the remote CV analysis worker.
//!
//! The worker decodes the video on its side, extracts golden frames and
//! scores visible damage, so the call runs under a minutes-scale budget
//! rather than a seconds-scale one.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use vgrade_models::{CvResults, ItemType, ScanId};

use crate::error::{CvClientError, CvResult};

/// Request sent to the CV worker.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    video_url: &'a str,
    scan_id: &'a str,
    item_type: &'a str,
}

/// Full CV worker response: golden frames plus the analysis payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvWorkerResponse {
    /// Still-image URLs, sharpest first
    #[serde(default)]
    pub golden_frames: Vec<String>,

    /// Timestamps (seconds) parallel to `golden_frames`
    #[serde(default)]
    pub frame_timestamps: Vec<f64>,

    /// Damage analysis over the extracted frames
    pub cv_analysis: CvAnalysis,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvAnalysis {
    /// Overall visible defect severity, 0-100
    pub damage_score: f64,

    /// Raw per-region defect scores
    #[serde(default)]
    pub region_scores: Option<BTreeMap<String, f64>>,

    /// Classifier region grades, when the trained model ran
    #[serde(default)]
    pub region_grades: Option<BTreeMap<String, f64>>,

    /// Which analysis produced the payload
    pub analysis_type: String,
}

impl CvWorkerResponse {
    /// Convert the wire payload into the stored model type.
    pub fn into_results(self) -> CvResults {
        CvResults {
            damage_score: self.cv_analysis.damage_score,
            region_scores: self.cv_analysis.region_scores,
            region_grades: self.cv_analysis.region_grades,
            analysis_type: self.cv_analysis.analysis_type,
        }
    }
}

/// CV worker client.
pub struct CvWorkerClient {
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl CvWorkerClient {
    /// Create a client from `VGRADE_CV_ENDPOINT` / `VGRADE_CV_TIMEOUT_SECS`.
    pub fn from_env() -> CvResult<Self> {
        let endpoint = std::env::var("VGRADE_CV_ENDPOINT")
            .map_err(|_| CvClientError::config("VGRADE_CV_ENDPOINT not set"))?;
        let timeout = std::env::var("VGRADE_CV_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        Ok(Self::new(endpoint, Duration::from_secs(timeout)))
    }

    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Run golden-frame extraction and damage scoring for a scan.
    pub async fn analyze_video(
        &self,
        video_url: &str,
        scan_id: &ScanId,
        item_type: ItemType,
    ) -> CvResult<CvWorkerResponse> {
        let request = AnalyzeRequest {
            video_url,
            scan_id: scan_id.as_str(),
            item_type: item_type.as_str(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CvClientError::Timeout(self.timeout.as_secs())
                } else {
                    CvClientError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(200).collect();
            return Err(CvClientError::Service {
                status: status.as_u16(),
                body: excerpt,
            });
        }

        let payload: CvWorkerResponse = response
            .json()
            .await
            .map_err(|e| CvClientError::InvalidResponse(e.to_string()))?;

        info!(
            scan_id = %scan_id,
            frames = payload.golden_frames.len(),
            damage = payload.cv_analysis.damage_score,
            "CV analysis complete"
        );
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_analyze_video_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "videoUrl": "https://example.com/v.mp4",
                "scanId": "scan-1",
                "itemType": "comic"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "scanId": "scan-1",
                "goldenFrames": ["https://cdn/f1.png", "https://cdn/f2.png"],
                "frameTimestamps": [1.2, 3.4],
                "cvAnalysis": {
                    "damageScore": 18.5,
                    "regionScores": { "surface": 12.0 },
                    "analysisType": "glint"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CvWorkerClient::new(server.uri(), Duration::from_secs(5));
        let response = client
            .analyze_video(
                "https://example.com/v.mp4",
                &ScanId::from_string("scan-1"),
                ItemType::Comic,
            )
            .await
            .unwrap();

        assert_eq!(response.golden_frames.len(), 2);
        assert_eq!(response.frame_timestamps, vec![1.2, 3.4]);

        let results = response.into_results();
        assert_eq!(results.damage_score, 18.5);
        assert_eq!(results.analysis_type, "glint");
        assert!(results.region_grades.is_none());
    }

    #[tokio::test]
    async fn test_worker_error_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = CvWorkerClient::new(server.uri(), Duration::from_secs(5));
        let err = client
            .analyze_video("u", &ScanId::from_string("scan-1"), ItemType::Card)
            .await
            .unwrap_err();

        assert!(matches!(err, CvClientError::Service { status: 502, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_timeout_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client = CvWorkerClient::new(server.uri(), Duration::from_millis(50));
        let err = client
            .analyze_video("u", &ScanId::from_string("scan-1"), ItemType::Card)
            .await
            .unwrap_err();

        assert!(matches!(err, CvClientError::Timeout(_)));
        assert!(err.is_retryable());
    }
}
