//! Video normalization through an FFmpeg subprocess pipe.
//!
//! Source bytes stream into the transcoder's stdin and the canonical
//! output is read back from stdout. The output is buffered fully in
//! memory: the downstream upload client cannot consume a live pipe, so
//! the complete buffer is the contract here.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::fetch::fetch_bytes;

/// How much of the transcoder's stderr to keep for diagnostics.
const STDERR_TAIL_BYTES: usize = 2048;

/// Canonical output profile for the normalizer.
///
/// The frame rate balances inference payload size against defect-detection
/// fidelity: sparser sampling loses transient defects, denser sampling
/// risks payload and time limits on the vision API.
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Transcoder binary, resolved through PATH
    pub transcoder_bin: String,
    /// Maximum output height; width follows the aspect ratio
    pub max_height: u32,
    /// Output frame rate
    pub fps: u32,
    /// x264 constant rate factor
    pub crf: u8,
    /// Budget for the transcode subprocess
    pub transcode_timeout: Duration,
    /// Budget for fetching the source (connect + full body)
    pub download_timeout: Duration,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            transcoder_bin: "ffmpeg".to_string(),
            max_height: 720,
            fps: 10,
            crf: 28,
            transcode_timeout: Duration::from_secs(120),
            download_timeout: Duration::from_secs(60),
        }
    }
}

impl NormalizerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            transcoder_bin: std::env::var("VGRADE_TRANSCODER_BIN")
                .unwrap_or(defaults.transcoder_bin),
            max_height: std::env::var("VGRADE_NORMALIZE_MAX_HEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_height),
            fps: std::env::var("VGRADE_NORMALIZE_FPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.fps),
            crf: std::env::var("VGRADE_NORMALIZE_CRF")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.crf),
            transcode_timeout: Duration::from_secs(
                std::env::var("VGRADE_TRANSCODE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.transcode_timeout.as_secs()),
            ),
            download_timeout: Duration::from_secs(
                std::env::var("VGRADE_DOWNLOAD_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.download_timeout.as_secs()),
            ),
        }
    }
}

/// Normalizes arbitrary input videos into the canonical analysis format.
pub struct VideoNormalizer {
    config: NormalizerConfig,
    client: reqwest::Client,
}

impl VideoNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Download the source and transcode it to the canonical profile.
    pub async fn normalize(&self, source_url: &str) -> MediaResult<Vec<u8>> {
        let source = fetch_bytes(&self.client, source_url, self.config.download_timeout).await?;
        self.transcode(&source).await
    }

    /// Transcode raw video bytes to the canonical profile.
    ///
    /// Canonical form: H.264, height capped, reduced frame rate, audio
    /// stripped, fragmented MP4 so FFmpeg can write to a non-seekable pipe.
    pub async fn transcode(&self, input: &[u8]) -> MediaResult<Vec<u8>> {
        which::which(&self.config.transcoder_bin).map_err(|_| MediaError::FfmpegNotFound)?;

        let args = self.build_args();
        debug!(
            "Running transcoder: {} {}",
            self.config.transcoder_bin,
            args.join(" ")
        );

        let mut child = Command::new(&self.config.transcoder_bin)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child.stdin.take().expect("stdin not captured");
        let mut stdout = child.stdout.take().expect("stdout not captured");
        let mut stderr = child.stderr.take().expect("stderr not captured");

        // Feed input from a separate task so a transcoder that stops
        // reading early cannot deadlock the output read. A broken pipe
        // here is expected in that case and not an error by itself.
        let input_owned = input.to_vec();
        let writer = tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&input_owned).await {
                debug!("transcoder stdin closed early: {}", e);
            }
            // Dropping stdin sends EOF.
        });

        let mut output = Vec::new();
        let mut stderr_buf = Vec::new();

        let io_and_wait = async {
            let read_out = stdout.read_to_end(&mut output);
            let read_err = stderr.read_to_end(&mut stderr_buf);
            let (out_res, _err_res) = tokio::join!(read_out, read_err);
            out_res?;
            child.wait().await
        };

        // Bind before matching so the borrow of `child` inside the future
        // is released before the kill path needs it.
        let waited = tokio::time::timeout(self.config.transcode_timeout, io_and_wait).await;
        let status = match waited {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    "transcode timed out after {}s, killing process",
                    self.config.transcode_timeout.as_secs()
                );
                let _ = child.kill().await;
                writer.abort();
                return Err(MediaError::TranscodeTimeout(
                    self.config.transcode_timeout.as_secs(),
                ));
            }
        };

        let _ = writer.await;

        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                stderr_tail(&stderr_buf),
                status.code(),
            ));
        }

        // A clean exit with an empty buffer is silent truncation, not success.
        if output.is_empty() {
            return Err(MediaError::EmptyOutput);
        }

        debug!(bytes = output.len(), "transcode complete");
        Ok(output)
    }

    fn build_args(&self) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-i".to_string(),
            "pipe:0".to_string(),
            "-vf".to_string(),
            format!("scale=-2:'min({},ih)'", self.config.max_height),
            "-r".to_string(),
            self.config.fps.to_string(),
            "-an".to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "veryfast".to_string(),
            "-crf".to_string(),
            self.config.crf.to_string(),
            "-movflags".to_string(),
            "frag_keyframe+empty_moov".to_string(),
            "-f".to_string(),
            "mp4".to_string(),
            "pipe:1".to_string(),
        ]
    }
}

/// Last chunk of stderr, lossily decoded, for error messages.
fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_string()
}
