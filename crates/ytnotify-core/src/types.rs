//! Domain types for videos, channels, notices, filters and recorder endpoints.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Messaging-platform conversation id.
pub type ChatId = i64;
/// Messaging-platform message id.
pub type MessageId = i64;

/// Value stored in the notices table for a row that has no message yet.
pub const SENTINEL_MESSAGE_ID: MessageId = -1;

pub const VIDEO_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";
pub const CHANNEL_URL_PREFIX: &str = "https://www.youtube.com/channel/";

/// A YouTube channel with its cached title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub title: String,
}

impl Channel {
    pub fn url(&self) -> String {
        format!("{CHANNEL_URL_PREFIX}{}", self.id)
    }
}

/// Live-streaming timestamps reported by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStreamingDetails {
    pub scheduled_start: Option<DateTime<Utc>>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
}

/// Where a video stands in the upcoming → live → completed progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BroadcastState {
    /// A regular upload, no streaming details at all.
    NotBroadcast,
    Upcoming,
    Live,
    Completed,
}

impl BroadcastState {
    /// True when nothing about the video will change any more.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BroadcastState::NotBroadcast | BroadcastState::Completed)
    }
}

impl std::fmt::Display for BroadcastState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BroadcastState::NotBroadcast => write!(f, "Video"),
            BroadcastState::Upcoming => write!(f, "Upcoming"),
            BroadcastState::Live => write!(f, "Live"),
            BroadcastState::Completed => write!(f, "Completed"),
        }
    }
}

/// Snapshot of a video as returned by the platform API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub channel_id: String,
    pub channel_title: String,
    pub title: String,
    pub live: Option<LiveStreamingDetails>,
}

impl Video {
    pub fn url(&self) -> String {
        format!("{VIDEO_URL_PREFIX}{}", self.id)
    }

    pub fn broadcast_state(&self) -> BroadcastState {
        match &self.live {
            None => BroadcastState::NotBroadcast,
            Some(d) if d.actual_end.is_some() => BroadcastState::Completed,
            Some(d) if d.actual_start.is_some() => BroadcastState::Live,
            Some(d) if d.scheduled_start.is_some() => BroadcastState::Upcoming,
            // Streaming details without any timestamp: nothing to wait for.
            Some(_) => BroadcastState::NotBroadcast,
        }
    }

    pub fn scheduled_start(&self) -> Option<DateTime<Utc>> {
        self.live.as_ref().and_then(|d| d.scheduled_start)
    }

    /// Signed time until the scheduled start; negative once it has passed.
    pub fn time_to_start(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.scheduled_start().map(|t| t - now)
    }
}

/// Persisted view of a tracked video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
    pub id: String,
    pub channel_id: String,
    pub channel_title: String,
    pub title: String,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub completed: bool,
}

impl From<&Video> for VideoRecord {
    fn from(v: &Video) -> Self {
        Self {
            id: v.id.clone(),
            channel_id: v.channel_id.clone(),
            channel_title: v.channel_title.clone(),
            title: v.title.clone(),
            scheduled_start: v.scheduled_start(),
            completed: v.broadcast_state() == BroadcastState::Completed,
        }
    }
}

/// Per (video, chat) delivery record. `message_id` is `None` until a
/// notification message has been sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub video_id: String,
    pub chat_id: ChatId,
    pub message_id: Option<MessageId>,
}

impl Notice {
    pub fn is_sent(&self) -> bool {
        self.message_id.is_some()
    }
}

/// One allow- or block-list for a (chat, channel) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub block: bool,
    pub words: Vec<String>,
}

impl FilterRule {
    /// Parse the comma-separated storage form. Words are lowercased and blank
    /// entries dropped.
    pub fn from_stored(block: bool, content: &str) -> Self {
        let words = content
            .split(',')
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { block, words }
    }

    pub fn to_stored(&self) -> String {
        self.words.join(",")
    }
}

/// A chat's external recorder service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderEndpoint {
    pub url: String,
    pub token: String,
}
