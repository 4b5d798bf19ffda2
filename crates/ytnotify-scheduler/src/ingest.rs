//! Push callback ingestion: decode, discard stale deliveries, dispatch.

use std::sync::Arc;
use tokio::task::JoinHandle;
use ytnotify_channels::{FeedEntry, FeedEvent, decode_feed};
use ytnotify_core::error::Result;

use crate::engine::Scheduler;

pub struct FeedIngestor {
    scheduler: Arc<Scheduler>,
}

impl FeedIngestor {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self { scheduler }
    }

    /// Decode a push body and process it on its own task. Undecodable
    /// bodies are logged and dropped.
    pub fn dispatch(self: &Arc<Self>, body: &[u8]) -> Option<JoinHandle<()>> {
        let event = match decode_feed(body) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("⚠️ Dropping push body: {e}");
                return None;
            }
        };

        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            if let Err(e) = this.process(event).await {
                tracing::warn!("⚠️ Push handling failed: {e}");
            }
        }))
    }

    pub async fn process(&self, event: FeedEvent) -> Result<()> {
        match event {
            FeedEvent::Entry(entry) => self.on_entry(entry).await,
            FeedEvent::Deleted { video_id, .. } => self.scheduler.notifier().delete(&video_id).await,
        }
    }

    async fn on_entry(&self, entry: FeedEntry) -> Result<()> {
        let notifier = self.scheduler.notifier();
        let store = notifier.store();

        if store.is_completed(&entry.video_id)? {
            tracing::debug!("⏭️ Push for completed {} ignored", entry.video_id);
            return Ok(());
        }

        let video = self.scheduler.api().get_video(&entry.video_id).await?;
        tracing::info!("📥 Push: {} ({}) from {}", video.title, video.id, video.channel_title);

        notifier.publish(&video).await?;
        if let Err(e) = notifier.prepare_auto_records(&video) {
            tracing::error!("❌ Auto-record setup for {} failed: {e}", video.id);
        }
        self.scheduler.try_start_diligent(&video);

        if let Err(e) = store.update_channel_title(&video.channel_id, &video.channel_title) {
            tracing::error!("❌ Channel title refresh for {} failed: {e}", video.channel_id);
        }
        Ok(())
    }
}
