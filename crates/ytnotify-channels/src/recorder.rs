//! HTTP client for a chat's external recorder service.

use async_trait::async_trait;
use std::time::Duration;
use ytnotify_core::error::RecorderError;
use ytnotify_core::traits::{RecordJob, Recorder};
use ytnotify_core::types::RecorderEndpoint;

pub struct HttpRecorder {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpRecorder {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl Recorder for HttpRecorder {
    async fn submit(&self, endpoint: &RecorderEndpoint, job: &RecordJob) -> Result<(), RecorderError> {
        let response = self
            .client
            .post(&endpoint.url)
            .bearer_auth(&endpoint.token)
            .json(job)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RecorderError::Timeout
                } else {
                    RecorderError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(RecorderError::Status(status.as_u16()));
        }
        tracing::debug!("🎥 Recorder accepted {:?} for {}", job.action, job.video_id);
        Ok(())
    }
}
