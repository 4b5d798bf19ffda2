//! Test fixture: a full AppState wired to in-memory collaborators.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use ytnotify_core::config::SchedulerConfig;
use ytnotify_core::error::{MessagingError, RecorderError, Result, YtNotifyError};
use ytnotify_core::traits::{InlineKeyboard, Messenger, OutgoingMessage, PushHub, RecordJob, Recorder, VideoApi};
use ytnotify_core::types::{Channel, ChatId, MessageId, RecorderEndpoint, Video};
use ytnotify_db::Store;
use ytnotify_scheduler::{FeedIngestor, Notifier, RecordingService, Scheduler, SubscriptionManager};

use crate::server::AppState;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Send { chat_id: ChatId, text: String },
    EditKeyboard { chat_id: ChatId, message_id: MessageId, cleared: bool },
    Answer { callback_id: String, text: Option<String> },
    Other,
}

pub struct FakeMessenger {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI64,
}

impl FakeMessenger {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sends(&self) -> Vec<(ChatId, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send { chat_id, text } => Some((chat_id, text)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Messenger for FakeMessenger {
    async fn send_message(&self, message: &OutgoingMessage) -> std::result::Result<MessageId, MessagingError> {
        self.calls.lock().unwrap().push(Call::Send {
            chat_id: message.chat_id,
            text: message.text.clone(),
        });
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn edit_message_text(
        &self,
        _chat_id: ChatId,
        _message_id: MessageId,
        _text: &str,
        _keyboard: Option<&InlineKeyboard>,
    ) -> std::result::Result<(), MessagingError> {
        self.calls.lock().unwrap().push(Call::Other);
        Ok(())
    }

    async fn edit_message_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: &InlineKeyboard,
    ) -> std::result::Result<(), MessagingError> {
        self.calls.lock().unwrap().push(Call::EditKeyboard {
            chat_id,
            message_id,
            cleared: keyboard.rows.is_empty(),
        });
        Ok(())
    }

    async fn delete_message(&self, _chat_id: ChatId, _message_id: MessageId) -> std::result::Result<(), MessagingError> {
        self.calls.lock().unwrap().push(Call::Other);
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> std::result::Result<(), MessagingError> {
        self.calls.lock().unwrap().push(Call::Answer {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeVideoApi {
    videos: Mutex<HashMap<String, Video>>,
    channels: Mutex<HashMap<String, Channel>>,
}

impl FakeVideoApi {
    pub fn set(&self, video: Video) {
        self.videos.lock().unwrap().insert(video.id.clone(), video);
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
        let videos = self.videos.lock().unwrap();
        Ok(ids.iter().filter_map(|id| videos.get(id).cloned()).collect())
    }

    async fn get_channel(&self, id: &str) -> Result<Channel> {
        self.channels
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| YtNotifyError::NotFound(format!("channel {id}")))
    }
}

#[derive(Default)]
pub struct FakeHub {
    pub requests: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl PushHub for FakeHub {
    async fn subscribe(&self, channel_id: &str) -> Result<()> {
        self.requests
            .lock()
            .unwrap()
            .push(("subscribe".into(), channel_id.into()));
        Ok(())
    }

    async fn unsubscribe(&self, channel_id: &str) -> Result<()> {
        self.requests
            .lock()
            .unwrap()
            .push(("unsubscribe".into(), channel_id.into()));
        Ok(())
    }

    fn topic_url(&self, channel_id: &str) -> String {
        format!("https://www.youtube.com/xml/feeds/videos.xml?channel_id={channel_id}")
    }
}

#[derive(Default)]
pub struct FakeRecorder {
    pub jobs: Mutex<Vec<RecordJob>>,
}

#[async_trait]
impl Recorder for FakeRecorder {
    async fn submit(&self, _endpoint: &RecorderEndpoint, job: &RecordJob) -> std::result::Result<(), RecorderError> {
        self.jobs.lock().unwrap().push(job.clone());
        Ok(())
    }
}

pub const TELEGRAM_SECRET: &str = "s3cret";

pub struct Fixture {
    pub state: AppState,
    pub messenger: Arc<FakeMessenger>,
    pub api: Arc<FakeVideoApi>,
    pub hub: Arc<FakeHub>,
}

pub fn fixture() -> Fixture {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let messenger = Arc::new(FakeMessenger {
        calls: Mutex::new(Vec::new()),
        next_id: AtomicI64::new(100),
    });
    let api = Arc::new(FakeVideoApi::default());
    let hub = Arc::new(FakeHub::default());
    let recorder = Arc::new(FakeRecorder::default());

    let notifier = Arc::new(Notifier::new(store.clone(), messenger.clone()));
    let recording = Arc::new(RecordingService::new(
        store.clone(),
        messenger.clone(),
        api.clone(),
        recorder,
        "http://localhost/recorder".into(),
        Duration::ZERO,
    ));
    let config = SchedulerConfig {
        diligent_tick_secs: 0,
        live_record_delay_secs: 0,
        ..Default::default()
    };
    let scheduler = Arc::new(Scheduler::new(api.clone(), notifier, recording.clone(), config));
    let subscriptions = Arc::new(SubscriptionManager::new(store.clone(), hub.clone(), api.clone()));

    let state = AppState {
        store,
        messenger: messenger.clone(),
        subscriptions,
        ingestor: Arc::new(FeedIngestor::new(scheduler)),
        recording,
        telegram_secret: TELEGRAM_SECRET.into(),
        start_time: Instant::now(),
    };
    Fixture {
        state,
        messenger,
        api,
        hub,
    }
}

/// Put a (chat, channel) subscription straight into the store.
pub fn stored_channel(fx: &Fixture, chat_id: ChatId, id: &str, title: &str) {
    fx.state
        .store
        .subscribe(
            chat_id,
            &Channel {
                id: id.to_string(),
                title: title.to_string(),
            },
        )
        .unwrap();
}

/// Poll `check` until it holds or a second has passed.
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
