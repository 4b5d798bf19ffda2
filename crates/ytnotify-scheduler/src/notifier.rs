//! The per-video notification state machine.
//!
//! A video moves Unseen -> Tracked -> Completed. While tracked, every chat
//! that passed its filter owns one notice row and one message that is edited
//! in place. Completion (or a plain upload's single notification) tears the
//! rows down, and nothing is sent for a completed video again.

use std::sync::Arc;
use ytnotify_core::error::Result;
use ytnotify_core::traits::{InlineKeyboard, Messenger, OutgoingMessage};
use ytnotify_core::types::{ChatId, Notice, Video, VideoRecord};
use ytnotify_db::{NoticeUpsert, Store};

use crate::filter;
use crate::locks::KeyedLocks;
use crate::message;

pub struct Notifier {
    store: Arc<Store>,
    messenger: Arc<dyn Messenger>,
    locks: KeyedLocks,
}

impl Notifier {
    pub fn new(store: Arc<Store>, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            store,
            messenger,
            locks: KeyedLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn messenger(&self) -> &Arc<dyn Messenger> {
        &self.messenger
    }

    /// Bring every chat's notification for `video` up to date.
    ///
    /// Holds the video's lock throughout, so concurrent publishes for the same
    /// id cannot both see an unsent row and double-send.
    pub async fn publish(&self, video: &Video) -> Result<()> {
        let _guard = self.locks.lock(&video.id).await;

        if self.store.is_completed(&video.id)? {
            self.store.mark_completed(&video.id)?;
            tracing::debug!("⏭️ {} already completed, skipping", video.id);
            return Ok(());
        }

        self.store.upsert_video(&VideoRecord::from(video))?;
        self.create_notices(video)?;

        let text = message::compose(video);
        for notice in self.store.notices_for_video(&video.id)? {
            self.deliver(video, &notice, &text).await;
        }

        if video.broadcast_state().is_terminal() {
            self.store.mark_completed(&video.id)?;
            let removed = self.store.delete_notices_for_video(&video.id)?;
            tracing::info!(
                "🏁 {} is {}, tracking ended ({} notices cleared)",
                video.id,
                video.broadcast_state(),
                removed
            );
        }
        Ok(())
    }

    /// Insert an unsent notice for each subscribed chat that passes its filter.
    /// Chats that already have a row are not re-filtered.
    fn create_notices(&self, video: &Video) -> Result<()> {
        for chat_id in self.store.chats_for_channel(&video.channel_id)? {
            let created = self
                .store
                .notice_exists(&video.id, chat_id)
                .and_then(|exists| {
                    if exists || !filter::evaluate(&self.store, chat_id, &video.channel_id, &video.title)? {
                        return Ok(false);
                    }
                    self.store
                        .upsert_notice(&video.id, chat_id, None, NoticeUpsert::KeepExisting)
                });
            match created {
                Ok(true) => tracing::debug!("📝 Notice created for {} in chat {}", video.id, chat_id),
                Ok(false) => {}
                Err(e) => tracing::error!("❌ Notice setup for {} in chat {} failed: {e}", video.id, chat_id),
            }
        }
        Ok(())
    }

    /// Send or edit one chat's message. Failures are logged; an unsent row
    /// stays unsent so the next cycle retries.
    async fn deliver(&self, video: &Video, notice: &Notice, text: &str) {
        let keyboard = match self.show_record_button(notice.chat_id, video) {
            Ok(true) => Some(message::record_keyboard(&video.id)),
            Ok(false) => None,
            Err(e) => {
                tracing::error!("❌ Record button check for chat {} failed: {e}", notice.chat_id);
                None
            }
        };

        match notice.message_id {
            None => {
                let outgoing = OutgoingMessage::new(notice.chat_id, text).with_keyboard(keyboard);
                match self.messenger.send_message(&outgoing).await {
                    Ok(message_id) => {
                        if let Err(e) = self.store.upsert_notice(
                            &video.id,
                            notice.chat_id,
                            Some(message_id),
                            NoticeUpsert::Replace,
                        ) {
                            tracing::error!("❌ Saving message id for {} failed: {e}", video.id);
                        }
                    }
                    Err(e) => tracing::warn!("⚠️ Notify chat {} about {} failed: {e}", notice.chat_id, video.id),
                }
            }
            Some(message_id) => {
                match self
                    .messenger
                    .edit_message_text(notice.chat_id, message_id, text, keyboard.as_ref())
                    .await
                {
                    Ok(()) => {}
                    Err(e) if e.is_not_modified() => {
                        tracing::debug!("Message {} in chat {} unchanged", message_id, notice.chat_id)
                    }
                    Err(e) => tracing::warn!("⚠️ Edit message {} in chat {} failed: {e}", message_id, notice.chat_id),
                }
            }
        }
    }

    /// The Record button is offered to chats with a recorder that neither
    /// auto-record the channel nor already asked for this video.
    fn show_record_button(&self, chat_id: ChatId, video: &Video) -> Result<bool> {
        Ok(self.store.recorder_for(chat_id)?.is_some()
            && !self.store.has_auto_record(chat_id, &video.channel_id)?
            && !self.store.has_record(chat_id, &video.id)?)
    }

    /// Tombstone path: best-effort delete of every sent message, then drop
    /// the notice rows. The video row stays so later pushes are recognised.
    pub async fn delete(&self, video_id: &str) -> Result<()> {
        let _guard = self.locks.lock(video_id).await;

        let notices = self.store.notices_for_video(video_id)?;
        for notice in &notices {
            let Some(message_id) = notice.message_id else {
                continue;
            };
            if let Err(e) = self.messenger.delete_message(notice.chat_id, message_id).await {
                tracing::warn!("⚠️ Delete message {} in chat {} failed: {e}", message_id, notice.chat_id);
            }
        }
        self.store.delete_notices_for_video(video_id)?;
        tracing::info!("🗑️ {} retracted upstream, {} notices removed", video_id, notices.len());
        Ok(())
    }

    /// Strip the Record button from each notice and send a "now live"
    /// message. Returns every chat holding a notice, whether or not its
    /// announcement got through.
    pub async fn announce_live(&self, video: &Video) -> Result<Vec<ChatId>> {
        let _guard = self.locks.lock(&video.id).await;

        let text = message::live_announcement(video);
        let notices = self.store.notices_for_video(&video.id)?;
        let mut told = 0;
        for notice in &notices {
            if let Some(message_id) = notice.message_id {
                match self
                    .messenger
                    .edit_message_keyboard(notice.chat_id, message_id, &InlineKeyboard::empty())
                    .await
                {
                    Ok(()) => {}
                    Err(e) if e.is_not_modified() => {}
                    Err(e) => tracing::warn!("⚠️ Removing Record button in chat {} failed: {e}", notice.chat_id),
                }
            }

            let outgoing = OutgoingMessage::new(notice.chat_id, text.as_str()).no_preview();
            match self.messenger.send_message(&outgoing).await {
                Ok(_) => told += 1,
                Err(e) => tracing::warn!("⚠️ Live announcement to chat {} failed: {e}", notice.chat_id),
            }
        }
        tracing::info!("🔴 {} is live, {}/{} chats told", video.id, told, notices.len());
        Ok(notices.into_iter().map(|n| n.chat_id).collect())
    }

    /// Queue record requests for chats that auto-record the video's channel
    /// and whose filter passes.
    pub fn prepare_auto_records(&self, video: &Video) -> Result<()> {
        for chat_id in self.store.auto_record_chats(&video.channel_id)? {
            let queued = self.store.has_record(chat_id, &video.id).and_then(|exists| {
                if exists || !filter::evaluate(&self.store, chat_id, &video.channel_id, &video.title)? {
                    return Ok(false);
                }
                self.store.insert_record(chat_id, &video.id)
            });
            match queued {
                Ok(true) => tracing::info!("🎬 Auto-record queued for {} in chat {}", video.id, chat_id),
                Ok(false) => {}
                Err(e) => tracing::error!("❌ Auto-record setup for chat {} failed: {e}", chat_id),
            }
        }
        Ok(())
    }
}
