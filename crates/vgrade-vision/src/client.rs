//! Vision-language API client.
//!
//! Drives both vision passes: the initial single-shot grading of the
//! whole video and the multi-frame re-verification of golden frames.

use std::time::Duration;

use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vgrade_models::{AiResults, DetailedAnalysis, ItemType};

use crate::error::{VisionError, VisionResult};
use crate::json_extract::extract_json;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const FALLBACK_MODELS: &[&str] = &["gemini-2.5-flash-lite", "gemini-2.5-pro"];
const VIDEO_MIME: &str = "video/mp4";
const FRAME_MIME: &str = "image/png";

/// Video payload for the initial pass: inline bytes or a hosted file
/// reference, depending on what the caller has.
#[derive(Debug, Clone)]
pub enum VideoSource {
    Bytes(Vec<u8>),
    Url(String),
}

/// Vision API client.
pub struct VisionClient {
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

/// Vision API request.
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(rename = "fileData", skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    fn inline(mime_type: &str, data: &[u8]) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(data),
            }),
            ..Default::default()
        }
    }

    fn file(mime_type: &str, uri: &str) -> Self {
        Self {
            file_data: Some(FileData {
                mime_type: mime_type.to_string(),
                file_uri: uri.to_string(),
            }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Serialize)]
struct FileData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    #[serde(rename = "fileUri")]
    file_uri: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

/// Vision API response.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

impl VisionClient {
    /// Create a new client from `VGRADE_VISION_API_KEY`.
    pub fn from_env() -> VisionResult<Self> {
        let api_key = std::env::var("VGRADE_VISION_API_KEY")
            .map_err(|_| VisionError::config("VGRADE_VISION_API_KEY not set"))?;
        let model =
            std::env::var("VGRADE_VISION_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let timeout = std::env::var("VGRADE_VISION_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120);

        Ok(Self::new(api_key, model, Duration::from_secs(timeout)))
    }

    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at a different endpoint (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Initial single-pass grading of the whole video.
    pub async fn analyze_initial(
        &self,
        video: &VideoSource,
        item_type: ItemType,
    ) -> VisionResult<AiResults> {
        let video_part = match video {
            VideoSource::Bytes(bytes) => {
                if bytes.is_empty() {
                    return Err(VisionError::validation("video payload is empty"));
                }
                Part::inline(VIDEO_MIME, bytes)
            }
            VideoSource::Url(url) => {
                if url.is_empty() {
                    return Err(VisionError::validation("video URL is empty"));
                }
                Part::file(VIDEO_MIME, url)
            }
        };

        let prompt = build_initial_prompt(item_type);
        let parts = vec![video_part, Part::text(prompt)];

        self.generate_with_fallback(parts).await
    }

    /// Multi-frame re-verification: all golden frames in one request, with
    /// a comparison prompt separating consensus defects from single-frame
    /// artifacts.
    pub async fn reverify_frames(
        &self,
        frames: &[Vec<u8>],
        item_type: ItemType,
    ) -> VisionResult<DetailedAnalysis> {
        if frames.len() < 2 {
            return Err(VisionError::validation(
                "re-verification needs at least two frames",
            ));
        }

        let mut parts: Vec<Part> = frames
            .iter()
            .map(|frame| Part::inline(FRAME_MIME, frame))
            .collect();
        parts.push(Part::text(build_reverify_prompt(item_type, frames.len())));

        self.generate_with_fallback(parts).await
    }

    /// Call the API, walking the fallback model list on failure.
    async fn generate_with_fallback<T: serde::de::DeserializeOwned>(
        &self,
        parts: Vec<Part>,
    ) -> VisionResult<T> {
        let mut models = vec![self.model.as_str()];
        models.extend(FALLBACK_MODELS.iter().copied().filter(|m| *m != self.model));

        let mut last_error = None;

        for model in models {
            match self.generate(model, &parts).await {
                Ok(value) => {
                    info!("vision response from {}", model);
                    return Ok(value);
                }
                Err(e) if e.is_retryable() || matches!(e, VisionError::NotFound(_)) => {
                    warn!("vision model {} failed: {}", model, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| VisionError::Network("no vision models tried".into())))
    }

    async fn generate<T: serde::de::DeserializeOwned>(
        &self,
        model: &str,
        parts: &[Part],
    ) -> VisionResult<T> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: parts.to_vec(),
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VisionError::Timeout(self.timeout.as_secs())
                } else {
                    VisionError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(VisionError::NotFound(model.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(200).collect();
            return Err(VisionError::Service {
                status: status.as_u16(),
                body: excerpt,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| VisionError::Network(format!("malformed response envelope: {}", e)))?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| VisionError::Network("no content in vision response".into()))?;

        Ok(extract_json(text)?)
    }
}

/// Build the fixed instruction prompt for the initial pass.
fn build_initial_prompt(item_type: ItemType) -> String {
    format!(
        r#"You are a professional {item} grader. Examine this video of a {item} and assess its physical condition.

Look for: surface wear, corner damage, edge wear, creases, tears, stains, spine stress, and print defects.

IMPORTANT: You must strictly follow this output format.
Return ONLY a single JSON object with this schema:
{{
  "title": "Name of the {item}",
  "issue_id": "Issue or set identifier if readable, else null",
  "estimated_grade": "Numeric grade on the 0.5-10 scale, as a string",
  "reasoning": "Short explanation of the grade"
}}"#,
        item = item_type.as_str()
    )
}

/// Build the comparison prompt for multi-frame re-verification.
fn build_reverify_prompt(item_type: ItemType, frame_count: usize) -> String {
    format!(
        r#"These {count} images are sharp frames of the same {item}, taken from a video at different angles and lighting.

Compare the frames. A defect visible in several frames is real damage; a mark visible in only one frame is likely reflection or glare.

IMPORTANT: You must strictly follow this output format.
Return ONLY a single JSON object with this schema:
{{
  "consensus_defects": ["defects confirmed across multiple frames"],
  "single_frame_artifacts": ["marks dismissed as lighting artifacts"],
  "suggested_grade": 0.0,
  "notes": "Short comparison summary"
}}

Set suggested_grade to your grade on the 0.5-10 scale after discounting the artifacts."#,
        count = frame_count,
        item = item_type.as_str()
    )
}
