//! Media ingestion adapter.
//!
//! Wraps the remote image host behind `MediaStore`: a buffer goes in, a
//! stable URL comes out. Each attempt is bounded by a 120s deadline; the
//! whole operation is bounded by 3 attempts with exponential backoff
//! (1s, 2s, 4s). Exhaustion surfaces as `MediaError::UploadFailed`, which
//! callers must keep distinct from validation failures.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

/// Attempts before giving up.
pub const UPLOAD_ATTEMPTS: u32 = 3;

/// Per-attempt transport deadline.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// A single attempt failed; retried internally.
    #[error("upload attempt failed: {0}")]
    Transport(String),
    /// All attempts exhausted.
    #[error("image upload failed after {attempts} attempts: {last}")]
    UploadFailed { attempts: u32, last: String },
}

/// Capability: object storage for images.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload a binary buffer into `folder`, returning the public URL.
    async fn store(&self, bytes: Bytes, folder: &str) -> Result<String, MediaError>;
}

/// Backoff schedule: 1s, 2s, 4s for retries 0, 1, 2.
pub fn backoff_delay(retry: u32) -> Duration {
    Duration::from_secs(1u64 << retry.min(16))
}

/// Run `op` up to `attempts` times, sleeping the backoff schedule between
/// attempts. Generic so the retry discipline is testable without a network.
pub async fn with_retry<T, F, Fut>(attempts: u32, mut op: F) -> Result<T, MediaError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MediaError>>,
{
    let mut last = String::from("no attempts were made");
    for attempt in 0..attempts {
        if attempt > 0 {
            let delay = backoff_delay(attempt - 1);
            tracing::warn!(
                attempt,
                delay_secs = delay.as_secs(),
                "retrying upload: {}",
                last
            );
            tokio::time::sleep(delay).await;
        }
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => last = e.to_string(),
        }
    }
    Err(MediaError::UploadFailed { attempts, last })
}

#[derive(Debug, Deserialize)]
struct UploadResult {
    secure_url: Option<String>,
    url: Option<String>,
}

/// Image-host client posting unsigned multipart uploads.
#[derive(Debug, Clone)]
pub struct CloudinaryStore {
    client: reqwest::Client,
    upload_url: String,
    upload_preset: String,
}

impl CloudinaryStore {
    pub fn from_env() -> Self {
        let upload_url = std::env::var("MEDIA_UPLOAD_URL")
            .unwrap_or_else(|_| "https://api.cloudinary.com/v1_1/demo/auto/upload".to_string());
        let upload_preset = std::env::var("MEDIA_UPLOAD_PRESET").unwrap_or_default();
        let client = reqwest::Client::builder()
            .timeout(ATTEMPT_TIMEOUT)
            .build()
            .expect("Failed to build upload HTTP client");
        Self {
            client,
            upload_url,
            upload_preset,
        }
    }

    async fn try_upload(&self, bytes: Bytes, folder: &str) -> Result<String, MediaError> {
        let part = reqwest::multipart::Part::stream(reqwest::Body::from(bytes))
            .file_name("upload");
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone())
            .text("folder", folder.to_string());

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Transport(format!(
                "upload endpoint returned {status}"
            )));
        }

        let body: UploadResult = response
            .json()
            .await
            .map_err(|e| MediaError::Transport(e.to_string()))?;

        body.secure_url
            .or(body.url)
            .ok_or_else(|| MediaError::Transport("upload response had no url".to_string()))
    }
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    async fn store(&self, bytes: Bytes, folder: &str) -> Result<String, MediaError> {
        with_retry(UPLOAD_ATTEMPTS, || self.try_upload(bytes.clone(), folder)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_schedule_doubles_from_one_second() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_recovers_from_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry(UPLOAD_ATTEMPTS, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(MediaError::Transport("connection reset".to_string()))
                } else {
                    Ok("https://img.example/x.png".to_string())
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "https://img.example/x.png");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_exhaustion_is_typed() {
        let calls = AtomicU32::new(0);
        let result: Result<String, _> = with_retry(UPLOAD_ATTEMPTS, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(MediaError::Transport("boom".to_string())) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), UPLOAD_ATTEMPTS);
        match result {
            Err(MediaError::UploadFailed { attempts, last }) => {
                assert_eq!(attempts, UPLOAD_ATTEMPTS);
                assert!(last.contains("boom"));
            }
            other => panic!("expected UploadFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_with_retry_first_success_skips_backoff() {
        let start = std::time::Instant::now();
        let result = with_retry(UPLOAD_ATTEMPTS, || async { Ok(1u32) }).await;
        assert_eq!(result.unwrap(), 1);
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
