//! Telegram Bot API client: message send/edit/delete and callback answers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use ytnotify_core::error::{MessagingError, Result, YtNotifyError};
use ytnotify_core::traits::{InlineKeyboard, Messenger, OutgoingMessage};
use ytnotify_core::types::{ChatId, MessageId};

const NOT_MODIFIED: &str = "message is not modified";

/// Telegram bot bound to one token.
pub struct TelegramBot {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl TelegramBot {
    pub fn new(api_base: &str, token: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// POST a Bot API method and classify the outcome.
    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> std::result::Result<Option<T>, MessagingError> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| MessagingError::Transport(format!("{method} failed: {e}")))?;

        let body: TelegramApiResponse<T> = response
            .json()
            .await
            .map_err(|e| MessagingError::Transport(format!("Invalid {method} response: {e}")))?;

        if !body.ok {
            return Err(classify(body.error_code.unwrap_or_default(), body.description));
        }
        Ok(body.result)
    }

    /// Fetch the bot's own identity. Fails when the token is rejected.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        let me: Option<TelegramUser> = self.call("getMe", &serde_json::json!({})).await?;
        me.ok_or_else(|| YtNotifyError::Messaging(MessagingError::Transport("No bot info".into())))
    }

    /// Point Telegram at our update webhook.
    /// Register the webhook. Telegram echoes `secret` on every delivery.
    pub async fn set_webhook(&self, url: &str, secret: &str) -> Result<()> {
        let body = serde_json::json!({
            "url": url,
            "secret_token": secret,
            "allowed_updates": ["message", "callback_query"],
        });
        let _: Option<bool> = self.call("setWebhook", &body).await?;
        Ok(())
    }
}

fn classify(code: i64, description: Option<String>) -> MessagingError {
    let description = description.unwrap_or_default();
    if code == 400 && description.contains(NOT_MODIFIED) {
        MessagingError::NotModified
    } else {
        MessagingError::Api { code, description }
    }
}

fn reply_markup(keyboard: &InlineKeyboard) -> serde_json::Value {
    serde_json::json!({ "inline_keyboard": keyboard.rows })
}

#[async_trait]
impl Messenger for TelegramBot {
    async fn send_message(&self, message: &OutgoingMessage) -> std::result::Result<MessageId, MessagingError> {
        let mut body = serde_json::json!({
            "chat_id": message.chat_id,
            "text": message.text,
            "parse_mode": "MarkdownV2",
            "disable_web_page_preview": message.disable_preview,
            "disable_notification": message.silent,
        });
        if let Some(keyboard) = &message.keyboard {
            body["reply_markup"] = reply_markup(keyboard);
        }

        let sent: Option<TelegramMessage> = self.call("sendMessage", &body).await?;
        sent.map(|m| m.message_id)
            .ok_or_else(|| MessagingError::Transport("sendMessage returned no message".into()))
    }

    async fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> std::result::Result<(), MessagingError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "MarkdownV2",
        });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = reply_markup(keyboard);
        }
        self.call::<serde_json::Value>("editMessageText", &body).await?;
        Ok(())
    }

    async fn edit_message_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: &InlineKeyboard,
    ) -> std::result::Result<(), MessagingError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "reply_markup": reply_markup(keyboard),
        });
        self.call::<serde_json::Value>("editMessageReplyMarkup", &body).await?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> std::result::Result<(), MessagingError> {
        let body = serde_json::json!({ "chat_id": chat_id, "message_id": message_id });
        self.call::<serde_json::Value>("deleteMessage", &body).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> std::result::Result<(), MessagingError> {
        let mut body = serde_json::json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            body["text"] = serde_json::Value::from(text);
        }
        self.call::<serde_json::Value>("answerCallbackQuery", &body).await?;
        Ok(())
    }
}

/// Payload carried by inline buttons. Telegram caps it at 64 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CallbackData {
    Record {
        #[serde(rename = "videoID")]
        video_id: String,
    },
}

impl CallbackData {
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub error_code: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
    #[serde(default)]
    pub date: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: TelegramUser,
    pub message: Option<TelegramMessage>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
}
