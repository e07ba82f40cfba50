//! HTTP fetch of source videos and golden frames.

use std::time::Duration;

use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Download a URL fully into memory under a bounded window.
///
/// The timeout covers connect plus the whole body read. Errors
/// distinguish timeout from connection refusal from HTTP status so the
/// caller-facing message can name the actual failure.
pub async fn fetch_bytes(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> MediaResult<Vec<u8>> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_fetch_error(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(MediaError::HttpStatus(status.as_u16()));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| classify_fetch_error(e, timeout))?;

    debug!(url, bytes = bytes.len(), "fetched source");
    Ok(bytes.to_vec())
}

fn classify_fetch_error(e: reqwest::Error, timeout: Duration) -> MediaError {
    if e.is_timeout() {
        MediaError::DownloadTimeout(timeout.as_secs())
    } else if e.is_connect() {
        MediaError::ConnectionFailed(e.to_string())
    } else {
        MediaError::DownloadFailed(e.to_string())
    }
}
