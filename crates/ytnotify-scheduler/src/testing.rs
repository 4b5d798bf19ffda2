//! In-memory collaborators for engine tests.

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use ytnotify_core::error::{MessagingError, RecorderError, Result, YtNotifyError};
use ytnotify_core::traits::{InlineKeyboard, Messenger, OutgoingMessage, PushHub, RecordJob, Recorder, VideoApi};
use ytnotify_core::types::{Channel, ChatId, LiveStreamingDetails, MessageId, RecorderEndpoint, Video};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Send {
        chat_id: ChatId,
        text: String,
        keyboard: Option<InlineKeyboard>,
    },
    EditText {
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: Option<InlineKeyboard>,
    },
    EditKeyboard {
        chat_id: ChatId,
        message_id: MessageId,
    },
    Delete {
        chat_id: ChatId,
        message_id: MessageId,
    },
    Answer {
        callback_id: String,
    },
}

/// Records every call; message ids count up from 100.
pub struct FakeMessenger {
    pub calls: Mutex<Vec<Call>>,
    next_id: AtomicI64,
    pub fail_sends: AtomicBool,
    pub edit_error: Mutex<Option<MessagingError>>,
}

impl FakeMessenger {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(100),
            fail_sends: AtomicBool::new(false),
            edit_error: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sends(&self) -> Vec<(ChatId, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send { chat_id, text, .. } => Some((chat_id, text)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }
}

#[async_trait]
impl Messenger for FakeMessenger {
    async fn send_message(&self, message: &OutgoingMessage) -> std::result::Result<MessageId, MessagingError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(MessagingError::Transport("connection reset".into()));
        }
        self.calls.lock().unwrap().push(Call::Send {
            chat_id: message.chat_id,
            text: message.text.clone(),
            keyboard: message.keyboard.clone(),
        });
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        _text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> std::result::Result<(), MessagingError> {
        self.calls.lock().unwrap().push(Call::EditText {
            chat_id,
            message_id,
            keyboard: keyboard.cloned(),
        });
        match self.edit_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn edit_message_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        _keyboard: &InlineKeyboard,
    ) -> std::result::Result<(), MessagingError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::EditKeyboard { chat_id, message_id });
        Ok(())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> std::result::Result<(), MessagingError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Delete { chat_id, message_id });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, _text: Option<&str>) -> std::result::Result<(), MessagingError> {
        self.calls.lock().unwrap().push(Call::Answer {
            callback_id: callback_id.to_string(),
        });
        Ok(())
    }
}

/// Serves scripted snapshots. With several snapshots queued for an id, each
/// fetch pops one; the last one keeps being served.
pub struct FakeVideoApi {
    scripts: Mutex<HashMap<String, VecDeque<Video>>>,
    channels: Mutex<HashMap<String, Channel>>,
    pub fail: AtomicBool,
    pub fetches: AtomicUsize,
}

impl FakeVideoApi {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            channels: Mutex::new(HashMap::new()),
            fail: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, video: Video) {
        self.script(vec![video]);
    }

    pub fn script(&self, snapshots: Vec<Video>) {
        let id = snapshots[0].id.clone();
        self.scripts
            .lock()
            .unwrap()
            .insert(id, snapshots.into_iter().collect());
    }

    pub fn add_channel(&self, id: &str, title: &str) {
        self.channels.lock().unwrap().insert(
            id.to_string(),
            Channel {
                id: id.to_string(),
                title: title.to_string(),
            },
        );
    }
}

#[async_trait]
impl VideoApi for FakeVideoApi {
    async fn get_videos(&self, ids: &[String]) -> Result<Vec<Video>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(YtNotifyError::Platform("quota exceeded".into()));
        }
        let mut scripts = self.scripts.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| {
                let queue = scripts.get_mut(id)?;
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
            .collect())
    }

    async fn get_channel(&self, id: &str) -> Result<Channel> {
        self.channels
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| YtNotifyError::NotFound(format!("Invalid channel ID: {id}")))
    }
}

#[derive(Default)]
pub struct FakeHub {
    pub requests: Mutex<Vec<(String, String)>>,
    pub failing: Mutex<HashSet<String>>,
}

impl FakeHub {
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, mode: &str, channel_id: &str) -> Result<()> {
        self.requests
            .lock()
            .unwrap()
            .push((mode.to_string(), channel_id.to_string()));
        if self.failing.lock().unwrap().contains(channel_id) {
            return Err(YtNotifyError::Hub(format!("{mode} {channel_id} rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl PushHub for FakeHub {
    async fn subscribe(&self, channel_id: &str) -> Result<()> {
        self.record("subscribe", channel_id)
    }

    async fn unsubscribe(&self, channel_id: &str) -> Result<()> {
        self.record("unsubscribe", channel_id)
    }

    fn topic_url(&self, channel_id: &str) -> String {
        format!("https://www.youtube.com/xml/feeds/videos.xml?channel_id={channel_id}")
    }
}

#[derive(Default)]
pub struct FakeRecorder {
    pub jobs: Mutex<Vec<(RecorderEndpoint, RecordJob)>>,
    pub error: Mutex<Option<RecorderError>>,
}

impl FakeRecorder {
    pub fn jobs(&self) -> Vec<RecordJob> {
        self.jobs.lock().unwrap().iter().map(|(_, j)| j.clone()).collect()
    }
}

#[async_trait]
impl Recorder for FakeRecorder {
    async fn submit(&self, endpoint: &RecorderEndpoint, job: &RecordJob) -> std::result::Result<(), RecorderError> {
        self.jobs
            .lock()
            .unwrap()
            .push((endpoint.clone(), job.clone()));
        match self.error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

pub fn upload(id: &str, channel_id: &str, title: &str) -> Video {
    Video {
        id: id.to_string(),
        channel_id: channel_id.to_string(),
        channel_title: format!("{channel_id} title"),
        title: title.to_string(),
        live: None,
    }
}

/// Upcoming broadcast starting `in_` from now.
pub fn upcoming(id: &str, channel_id: &str, in_: TimeDelta) -> Video {
    Video {
        live: Some(LiveStreamingDetails {
            scheduled_start: Some(Utc::now() + in_),
            ..Default::default()
        }),
        ..upload(id, channel_id, "Stream")
    }
}

pub fn live(id: &str, channel_id: &str) -> Video {
    let start = Utc::now() - TimeDelta::minutes(1);
    Video {
        live: Some(LiveStreamingDetails {
            scheduled_start: Some(start),
            actual_start: Some(start),
            actual_end: None,
        }),
        ..upload(id, channel_id, "Stream")
    }
}

pub fn completed(id: &str, channel_id: &str) -> Video {
    let start = Utc::now() - TimeDelta::hours(2);
    Video {
        live: Some(LiveStreamingDetails {
            scheduled_start: Some(start),
            actual_start: Some(start),
            actual_end: Some(start + TimeDelta::hours(1)),
        }),
        ..upload(id, channel_id, "Stream")
    }
}

pub fn chan(id: &str) -> Channel {
    Channel {
        id: id.to_string(),
        title: format!("{id} title"),
    }
}
