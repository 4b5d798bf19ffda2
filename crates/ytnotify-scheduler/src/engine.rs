//! Scheduler: the hourly sweep over tracked videos and the hand-off to
//! per-video diligent loops.

use chrono::{TimeDelta, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use ytnotify_core::config::SchedulerConfig;
use ytnotify_core::error::Result;
use ytnotify_core::traits::VideoApi;
use ytnotify_core::types::{BroadcastState, Video};

use crate::diligent::{DiligentExit, DiligentSet};
use crate::notifier::Notifier;
use crate::recording::RecordingService;
use crate::tiers::{first_regular_wake, wait_tier};

pub struct Scheduler {
    api: Arc<dyn VideoApi>,
    notifier: Arc<Notifier>,
    recording: Arc<RecordingService>,
    diligent: Arc<DiligentSet>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        api: Arc<dyn VideoApi>,
        notifier: Arc<Notifier>,
        recording: Arc<RecordingService>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            api,
            notifier,
            recording,
            diligent: Arc::new(DiligentSet::new()),
            config,
        }
    }

    pub fn api(&self) -> &Arc<dyn VideoApi> {
        &self.api
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn diligent(&self) -> &Arc<DiligentSet> {
        &self.diligent
    }

    fn period(&self) -> TimeDelta {
        TimeDelta::from_std(self.config.update_frequency()).unwrap_or(TimeDelta::hours(1))
    }

    /// Refresh every video that still has a notice row. Returns how many
    /// videos the platform returned.
    pub async fn sweep(self: &Arc<Self>) -> Result<usize> {
        let ids = self.notifier.store().notice_video_ids()?;
        if ids.is_empty() {
            return Ok(0);
        }
        let videos = self.api.get_videos(&ids).await?;
        let count = videos.len();
        tracing::info!("🔄 Sweep: {} tracked, {} returned", ids.len(), count);

        join_all(videos.into_iter().map(|video| {
            let this = Arc::clone(self);
            async move {
                if let Err(e) = this.notifier.publish(&video).await {
                    tracing::error!("❌ Publish {} failed: {e}", video.id);
                }
                this.try_start_diligent(&video);
            }
        }))
        .await;
        Ok(count)
    }

    /// An upcoming broadcast starting within one period and not already
    /// being polled.
    pub fn qualifies(&self, video: &Video) -> bool {
        video.broadcast_state() == BroadcastState::Upcoming
            && video
                .time_to_start(Utc::now())
                .is_some_and(|remaining| remaining <= self.period())
            && !self.diligent.contains(&video.id)
    }

    /// Start a diligent loop for `video` if it qualifies. The loop's first
    /// poll waits for the next tier boundary.
    pub fn try_start_diligent(self: &Arc<Self>, video: &Video) -> Option<JoinHandle<DiligentExit>> {
        if !self.qualifies(video) {
            return None;
        }
        let claim = self.diligent.try_claim(&video.id)?;
        let first_wait = video
            .time_to_start(Utc::now())
            .map(wait_tier)
            .unwrap_or_default();

        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            tokio::time::sleep(first_wait).await;
            let exit = this.run_diligent(&claim).await;
            tracing::info!("🔍 Diligent polling for {} ended: {:?}", claim.video_id(), exit);
            drop(claim);
            exit
        }))
    }

    /// Announce a live broadcast, then after a short delay trigger record
    /// requests for every chat holding a notice.
    pub(crate) async fn go_live(&self, video: Video) {
        let chats = match self.notifier.announce_live(&video).await {
            Ok(chats) => chats,
            Err(e) => {
                tracing::error!("❌ Live announcement for {} failed: {e}", video.id);
                return;
            }
        };

        let recording = Arc::clone(&self.recording);
        let delay = std::time::Duration::from_secs(self.config.live_record_delay_secs);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            for chat_id in chats {
                recording.request(&video, chat_id).await;
            }
        });
    }

    /// Run the regular loop: first wake at the next period boundary aligned
    /// to the top of the hour, then once per period.
    pub fn spawn_regular(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.config.update_frequency();
            let now = Utc::now();
            let first = (first_regular_wake(now, self.period()) - now)
                .to_std()
                .unwrap_or_default();
            tracing::info!(
                "⏰ Regular sweep scheduled (first in {}s, then every {}s)",
                first.as_secs(),
                period.as_secs()
            );

            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + first, period);
            loop {
                interval.tick().await;
                if let Err(e) = self.sweep().await {
                    tracing::warn!("⚠️ Sweep failed: {e}");
                }
            }
        })
    }
}
