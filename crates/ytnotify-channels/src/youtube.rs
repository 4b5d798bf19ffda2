//! YouTube Data API v3 client for videos and channels by id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use ytnotify_core::error::{Result, YtNotifyError};
use ytnotify_core::traits::VideoApi;
use ytnotify_core::types::{Channel, LiveStreamingDetails, Video};

/// Max ids per list call.
pub const ID_LIMIT: usize = 50;

pub struct YoutubeApi {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl YoutubeApi {
    pub fn new(api_base: &str, api_key: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn list<T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        part: &str,
        ids: &[String],
    ) -> Result<Vec<T>> {
        let response = self
            .client
            .get(format!("{}/{}", self.api_base, resource))
            .query(&[
                ("part", part),
                ("id", ids.join(",").as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| YtNotifyError::Platform(format!("{resource}.list failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(YtNotifyError::Platform(format!(
                "{resource}.list returned {status}: {text}"
            )));
        }

        let body: ListResponse<T> = response
            .json()
            .await
            .map_err(|e| YtNotifyError::Platform(format!("Invalid {resource}.list response: {e}")))?;
        Ok(body.items)
    }
}

#[async_trait]
impl VideoApi for YoutubeApi {
    async fn get_videos(&self, ids: &[String]) -> Result<Vec<Video>> {
        let mut videos = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(ID_LIMIT) {
            let items: Vec<VideoItem> = self
                .list("videos", "snippet,liveStreamingDetails", chunk)
                .await?;
            videos.extend(items.into_iter().map(Video::from));
        }
        tracing::debug!("📺 Fetched {}/{} videos", videos.len(), ids.len());
        Ok(videos)
    }

    async fn get_channel(&self, id: &str) -> Result<Channel> {
        let items: Vec<ChannelItem> = self.list("channels", "snippet", &[id.to_string()]).await?;
        items
            .into_iter()
            .next()
            .map(|c| Channel {
                id: c.id,
                title: c.snippet.title,
            })
            .ok_or_else(|| YtNotifyError::NotFound(format!("Invalid channel ID: {id}")))
    }
}

// --- Data API Types ---

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    #[serde(default)]
    snippet: VideoSnippet,
    live_streaming_details: Option<ApiLiveDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    channel_title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiLiveDetails {
    scheduled_start_time: Option<DateTime<Utc>>,
    actual_start_time: Option<DateTime<Utc>>,
    actual_end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    snippet: ChannelSnippet,
}

#[derive(Debug, Deserialize)]
struct ChannelSnippet {
    title: String,
}

impl From<VideoItem> for Video {
    fn from(item: VideoItem) -> Self {
        Video {
            id: item.id,
            channel_id: item.snippet.channel_id,
            channel_title: item.snippet.channel_title,
            title: item.snippet.title,
            live: item.live_streaming_details.map(|d| LiveStreamingDetails {
                scheduled_start: d.scheduled_start_time,
                actual_start: d.actual_start_time,
                actual_end: d.actual_end_time,
            }),
        }
    }
}
