//! Record requests to a chat's recorder and the recorder's status reports.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use ytnotify_channels::markdown::{code, escape, link};
use ytnotify_core::error::{RecorderError, Result};
use ytnotify_core::traits::{Messenger, OutgoingMessage, RecordAction, RecordJob, Recorder, VideoApi};
use ytnotify_core::types::{BroadcastState, ChatId, Video};
use ytnotify_db::Store;

const PLATFORM: &str = "YouTube";

/// Status report posted by a recorder to the callback URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecordReport {
    pub success: bool,
    #[serde(default)]
    pub retry: bool,
    #[serde(rename = "chatID")]
    pub chat_id: ChatId,
    #[serde(rename = "videoID")]
    pub video_id: String,
    #[serde(default)]
    pub filename: String,
}

/// Reply body for a report. `retry: true` asks the recorder to keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordReply {
    pub retry: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The chat never asked to record this video.
    NotRequested,
    Unavailable,
    Started,
    TimedOut,
    Rejected(u16),
    Failed,
}

pub struct RecordingService {
    store: Arc<Store>,
    messenger: Arc<dyn Messenger>,
    api: Arc<dyn VideoApi>,
    recorder: Arc<dyn Recorder>,
    callback_url: String,
    retry_delay: Duration,
}

impl RecordingService {
    pub fn new(
        store: Arc<Store>,
        messenger: Arc<dyn Messenger>,
        api: Arc<dyn VideoApi>,
        recorder: Arc<dyn Recorder>,
        callback_url: String,
        retry_delay: Duration,
    ) -> Self {
        Self {
            store,
            messenger,
            api,
            recorder,
            callback_url,
            retry_delay,
        }
    }

    async fn tell(&self, chat_id: ChatId, text: String) {
        let outgoing = OutgoingMessage::new(chat_id, text).no_preview().silent();
        if let Err(e) = self.messenger.send_message(&outgoing).await {
            tracing::warn!("⚠️ Recorder notice to chat {} failed: {e}", chat_id);
        }
    }

    /// Ask the chat's recorder to capture `video`, if the chat requested it.
    /// The outcome is reported to the chat either way.
    pub async fn request(&self, video: &Video, chat_id: ChatId) -> RequestOutcome {
        let title = link(&escape(&video.title), &video.url());
        let internal_error = format!("Record {title} failed, internal server error");

        match self.store.has_record(chat_id, &video.id) {
            Ok(true) => {}
            Ok(false) => return RequestOutcome::NotRequested,
            Err(e) => {
                tracing::error!("❌ Record lookup for chat {} failed: {e}", chat_id);
                self.tell(chat_id, internal_error).await;
                return RequestOutcome::Failed;
            }
        }

        let endpoint = match self.store.recorder_for(chat_id) {
            Ok(Some(endpoint)) => endpoint,
            Ok(None) => {
                self.tell(chat_id, "Recorder unavailable for you".into()).await;
                return RequestOutcome::Unavailable;
            }
            Err(e) => {
                tracing::error!("❌ Recorder lookup for chat {} failed: {e}", chat_id);
                self.tell(chat_id, internal_error).await;
                return RequestOutcome::Failed;
            }
        };

        let job = RecordJob {
            action: RecordAction::Record,
            chat_id,
            video_id: video.id.clone(),
            channel_id: video.channel_id.clone(),
            url: video.url(),
            platform: PLATFORM.into(),
            callback: self.callback_url.clone(),
        };

        let (outcome, text) = match self.recorder.submit(&endpoint, &job).await {
            Ok(()) => (RequestOutcome::Started, format!("Start recording {title}")),
            Err(RecorderError::Timeout) => (
                RequestOutcome::TimedOut,
                format!("Record {title} failed, connection timeout"),
            ),
            Err(RecorderError::Status(code)) => (
                RequestOutcome::Rejected(code),
                format!("Record request failed with status code {code}, please check your recorder"),
            ),
            Err(RecorderError::Transport(e)) => {
                tracing::error!("❌ Recorder for chat {} unreachable: {e}", chat_id);
                (RequestOutcome::Failed, internal_error)
            }
        };
        tracing::info!("🎥 Record {} for chat {}: {:?}", video.id, chat_id, outcome);
        self.tell(chat_id, text).await;
        outcome
    }

    /// Handle a recorder's report. Failed reports flagged `retry` re-issue
    /// the request after the retry delay.
    pub async fn handle_report(self: &Arc<Self>, report: RecordReport) -> Result<RecordReply> {
        let video = self.api.get_video(&report.video_id).await?;
        let title = link(&escape(&video.title), &video.url());

        if !report.success {
            if report.retry {
                tracing::info!("🔁 Recorder asked to retry {} for chat {}", video.id, report.chat_id);
                let this = Arc::clone(self);
                let chat_id = report.chat_id;
                tokio::spawn(async move {
                    tokio::time::sleep(this.retry_delay).await;
                    this.request(&video, chat_id).await;
                });
            } else {
                self.tell(report.chat_id, format!("Failed to record {title}, check your recorder"))
                    .await;
            }
            return Ok(RecordReply { retry: false });
        }

        if matches!(video.broadcast_state(), BroadcastState::Upcoming | BroadcastState::Live) {
            return Ok(RecordReply { retry: true });
        }

        self.tell(
            report.chat_id,
            format!("{title} recorded as\n{}", code(&report.filename)),
        )
        .await;
        self.store.delete_record(report.chat_id, &report.video_id)?;
        tracing::info!("✅ {} recorded for chat {} as {}", video.id, report.chat_id, report.filename);
        Ok(RecordReply { retry: false })
    }
}
