//! Collaborator seams: the video platform, the messaging platform, the push
//! hub and the external recorder. The engine only talks to these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{MessagingError, RecorderError, Result, YtNotifyError};
use crate::types::{Channel, ChatId, MessageId, RecorderEndpoint, Video};

/// Read access to the video platform.
#[async_trait]
pub trait VideoApi: Send + Sync {
    /// Fetch snippet + live-streaming details for many ids. Unknown ids are
    /// silently absent from the result.
    async fn get_videos(&self, ids: &[String]) -> Result<Vec<Video>>;

    async fn get_channel(&self, id: &str) -> Result<Channel>;

    async fn get_video(&self, id: &str) -> Result<Video> {
        self.get_videos(&[id.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| YtNotifyError::NotFound(format!("video {id}")))
    }
}

/// One inline button attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

/// Rows of inline buttons. An empty keyboard clears existing buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn single(button: InlineButton) -> Self {
        Self {
            rows: vec![vec![button]],
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// An outbound text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
    pub disable_preview: bool,
    pub silent: bool,
}

impl OutgoingMessage {
    pub fn new(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            keyboard: None,
            disable_preview: false,
            silent: false,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Option<InlineKeyboard>) -> Self {
        self.keyboard = keyboard;
        self
    }

    pub fn no_preview(mut self) -> Self {
        self.disable_preview = true;
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

/// Messaging platform operations, keyed by (chat, message).
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, message: &OutgoingMessage) -> std::result::Result<MessageId, MessagingError>;

    async fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> std::result::Result<(), MessagingError>;

    async fn edit_message_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: &InlineKeyboard,
    ) -> std::result::Result<(), MessagingError>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> std::result::Result<(), MessagingError>;

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> std::result::Result<(), MessagingError>;
}

/// WebSub hub subscription requests for channel feeds.
#[async_trait]
pub trait PushHub: Send + Sync {
    async fn subscribe(&self, channel_id: &str) -> Result<()>;
    async fn unsubscribe(&self, channel_id: &str) -> Result<()>;
    /// Topic URL the hub knows a channel by.
    fn topic_url(&self, channel_id: &str) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAction {
    Record,
    Download,
}

/// Body sent to a chat's recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordJob {
    pub action: RecordAction,
    #[serde(rename = "chatID")]
    pub chat_id: ChatId,
    #[serde(rename = "videoID")]
    pub video_id: String,
    #[serde(rename = "channelID")]
    pub channel_id: String,
    pub url: String,
    pub platform: String,
    pub callback: String,
}

/// External recorder service.
#[async_trait]
pub trait Recorder: Send + Sync {
    async fn submit(&self, endpoint: &RecorderEndpoint, job: &RecordJob) -> std::result::Result<(), RecorderError>;
}
