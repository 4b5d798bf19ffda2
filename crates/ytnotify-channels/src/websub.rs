//! WebSub (PubSubHubbub) hub client and Atom push decoding.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::time::Duration;
use ytnotify_core::error::{Result, YtNotifyError};
use ytnotify_core::traits::PushHub;

const TOMBSTONE_PREFIX: &str = "yt:video:";

/// Sends subscribe/unsubscribe requests for channel feeds to one hub.
pub struct WebSubClient {
    client: reqwest::Client,
    hub_url: String,
    topic_prefix: String,
    callback_url: String,
    lease_seconds: u64,
}

impl WebSubClient {
    pub fn new(
        hub_url: &str,
        topic_prefix: &str,
        callback_url: &str,
        lease_seconds: u64,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            hub_url: hub_url.to_string(),
            topic_prefix: topic_prefix.to_string(),
            callback_url: callback_url.to_string(),
            lease_seconds,
        }
    }

    async fn request(&self, mode: &str, channel_id: &str) -> Result<()> {
        let topic = self.topic_url(channel_id);
        let lease = self.lease_seconds.to_string();
        let form = [
            ("hub.mode", mode),
            ("hub.topic", topic.as_str()),
            ("hub.callback", self.callback_url.as_str()),
            ("hub.verify", "async"),
            ("hub.lease_seconds", lease.as_str()),
        ];

        let response = self
            .client
            .post(&self.hub_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| YtNotifyError::Hub(format!("{mode} {channel_id} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(YtNotifyError::Hub(format!(
                "{mode} {channel_id} rejected with {status}: {text}"
            )));
        }
        tracing::debug!("📡 Hub accepted {mode} for {channel_id}");
        Ok(())
    }
}

#[async_trait]
impl PushHub for WebSubClient {
    async fn subscribe(&self, channel_id: &str) -> Result<()> {
        self.request("subscribe", channel_id).await
    }

    async fn unsubscribe(&self, channel_id: &str) -> Result<()> {
        self.request("unsubscribe", channel_id).await
    }

    fn topic_url(&self, channel_id: &str) -> String {
        format!("{}{}", self.topic_prefix, channel_id)
    }
}

/// A new or updated video announced by the hub.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub video_id: String,
    pub channel_id: String,
    pub title: String,
    pub author: String,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Entry(FeedEntry),
    /// Tombstone for a retracted video.
    Deleted {
        video_id: String,
        when: Option<DateTime<Utc>>,
    },
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn feed_err(e: impl std::fmt::Display) -> YtNotifyError {
    YtNotifyError::Feed(e.to_string())
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// `(ref, when)` attributes of a deleted-entry element.
fn tombstone_attrs(e: &BytesStart<'_>) -> Result<(String, Option<String>)> {
    let mut reference = String::new();
    let mut when = None;
    for attr in e.attributes() {
        let attr = attr.map_err(feed_err)?;
        let value = attr.unescape_value().map_err(feed_err)?.into_owned();
        match attr.key.local_name().as_ref() {
            b"ref" => reference = value,
            b"when" => when = Some(value),
            _ => {}
        }
    }
    Ok((reference, when))
}

/// Decode one push body. Element names are matched on their local part, so
/// any namespace prefix the hub picks is accepted.
pub fn decode_feed(body: &[u8]) -> Result<FeedEvent> {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut entry = FeedEntry::default();
    let mut tombstone: Option<(String, Option<String>)> = None;

    loop {
        match reader.read_event_into(&mut buf).map_err(feed_err)? {
            Event::Start(e) => {
                let name = local_name(&e);
                if name == "deleted-entry" {
                    tombstone = Some(tombstone_attrs(&e)?);
                }
                path.push(name);
            }
            Event::Empty(e) => {
                if local_name(&e) == "deleted-entry" {
                    tombstone = Some(tombstone_attrs(&e)?);
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(feed_err)?.into_owned();
                let n = path.len();
                let parent = n.checked_sub(2).map(|i| path[i].as_str());
                let in_entry = path.iter().any(|p| p == "entry");
                match (path.last().map(String::as_str), parent) {
                    (Some("videoId"), _) if in_entry => entry.video_id = text,
                    (Some("channelId"), _) if in_entry => entry.channel_id = text,
                    (Some("title"), Some("entry")) => entry.title = text,
                    (Some("name"), Some("author")) if in_entry => entry.author = text,
                    (Some("published"), Some("entry")) => entry.published = parse_time(&text),
                    (Some("updated"), Some("entry")) => entry.updated = parse_time(&text),
                    _ => {}
                }
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some((reference, when)) = tombstone {
        let video_id = reference
            .strip_prefix(TOMBSTONE_PREFIX)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| YtNotifyError::Feed(format!("unexpected tombstone ref: {reference}")))?;
        return Ok(FeedEvent::Deleted {
            video_id: video_id.to_string(),
            when: when.as_deref().and_then(parse_time),
        });
    }

    if entry.video_id.is_empty() || entry.channel_id.is_empty() {
        return Err(YtNotifyError::Feed("feed has neither an entry nor a tombstone".into()));
    }
    Ok(FeedEvent::Entry(entry))
}
