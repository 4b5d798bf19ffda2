//! Push-hub subscriptions for channels that have at least one subscriber.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use ytnotify_core::error::Result;
use ytnotify_core::traits::{PushHub, VideoApi};
use ytnotify_core::types::{Channel, ChatId};
use ytnotify_db::Store;

pub struct SubscriptionManager {
    store: Arc<Store>,
    hub: Arc<dyn PushHub>,
    api: Arc<dyn VideoApi>,
    /// Channel ids with a subscription the hub has accepted.
    active: Mutex<HashSet<String>>,
}

impl SubscriptionManager {
    pub fn new(store: Arc<Store>, hub: Arc<dyn PushHub>, api: Arc<dyn VideoApi>) -> Self {
        Self {
            store,
            hub,
            api,
            active: Mutex::new(HashSet::new()),
        }
    }

    fn active(&self) -> MutexGuard<'_, HashSet<String>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_active(&self, channel_id: &str) -> bool {
        self.active().contains(channel_id)
    }

    pub fn active_channels(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.active().iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Subscribe to a channel's feed unless a subscription is already held.
    pub async fn subscribe(&self, channel_id: &str) -> Result<()> {
        if !self.active().insert(channel_id.to_string()) {
            return Ok(());
        }
        if let Err(e) = self.hub.subscribe(channel_id).await {
            self.active().remove(channel_id);
            return Err(e);
        }
        tracing::info!("📡 Subscribed to {}", channel_id);
        Ok(())
    }

    /// Always sends the unsubscribe request.
    pub async fn unsubscribe(&self, channel_id: &str) -> Result<()> {
        self.active().remove(channel_id);
        self.hub.unsubscribe(channel_id).await?;
        tracing::info!("📴 Unsubscribed from {}", channel_id);
        Ok(())
    }

    /// Re-subscribe every stored channel after a restart. Reading the store
    /// is fatal; individual hub failures are logged. Returns the number of
    /// channels subscribed.
    pub async fn recover(&self) -> Result<usize> {
        let ids = self.store.channel_ids()?;
        let mut ok = 0;
        for id in &ids {
            match self.subscribe(id).await {
                Ok(()) => ok += 1,
                Err(e) => tracing::warn!("⚠️ Re-subscribe {} failed: {e}", id),
            }
        }
        tracing::info!("📡 Recovered {}/{} channel subscriptions", ok, ids.len());
        Ok(ok)
    }

    /// Subscribe a chat to a channel, looking the channel up first.
    pub async fn add_subscription(&self, chat_id: ChatId, channel_id: &str) -> Result<Channel> {
        let channel = self.api.get_channel(channel_id).await?;
        self.store.subscribe(chat_id, &channel)?;
        self.subscribe(&channel.id).await?;
        Ok(channel)
    }

    /// Remove a chat's subscription. When a row was removed, orphaned
    /// channels are collected in the background.
    pub fn remove_subscription(self: &Arc<Self>, chat_id: ChatId, channel_id: &str) -> Result<bool> {
        let removed = self.store.unsubscribe(chat_id, channel_id)?;
        if removed {
            let this = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = this.gc_orphaned_channels().await {
                    tracing::error!("❌ Channel GC failed: {e}");
                }
            });
        }
        Ok(removed)
    }

    /// Drop channels nobody subscribes to any more and unsubscribe from
    /// them. One failure never stops the rest.
    pub async fn gc_orphaned_channels(&self) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for id in self.store.orphaned_channel_ids()? {
            match self.collect_channel(&id).await {
                Ok(true) => removed.push(id),
                Ok(false) => tracing::debug!("♻️ {} picked up a subscriber, kept", id),
                Err(e) => tracing::error!("❌ Collecting channel {} failed: {e}", id),
            }
        }
        if !removed.is_empty() {
            tracing::info!("🧹 Collected {} orphaned channels", removed.len());
        }
        Ok(removed)
    }

    /// Delete one channel if it is still orphaned, then unsubscribe. A chat
    /// that subscribed while the hub request was in flight gets a fresh
    /// subscribe so the hub ends up subscribed.
    async fn collect_channel(&self, channel_id: &str) -> Result<bool> {
        if !self.store.delete_channel_if_orphaned(channel_id)? {
            return Ok(false);
        }
        if let Err(e) = self.unsubscribe(channel_id).await {
            tracing::warn!("⚠️ Unsubscribe {} failed: {e}", channel_id);
        }
        if !self.store.chats_for_channel(channel_id)?.is_empty() {
            self.active().remove(channel_id);
            self.subscribe(channel_id).await?;
        }
        Ok(true)
    }

    /// Whether a hub verification request matches what we asked for.
    pub fn verify_intent(&self, mode: &str, topic: &str) -> bool {
        let prefix = self.hub.topic_url("");
        let Some(channel_id) = topic.strip_prefix(prefix.as_str()) else {
            return false;
        };
        match mode {
            "subscribe" => self.is_active(channel_id),
            "unsubscribe" => !self.is_active(channel_id),
            _ => false,
        }
    }

    /// Re-send subscribe for every active channel once per `every`.
    pub fn spawn_lease_renewal(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("⏰ Lease renewal started (every {}s)", every.as_secs());
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            loop {
                interval.tick().await;
                for id in self.active_channels() {
                    if let Err(e) = self.hub.subscribe(&id).await {
                        tracing::warn!("⚠️ Lease renewal for {} failed: {e}", id);
                    }
                }
            }
        })
    }

    /// Best-effort unsubscribe of everything, for shutdown.
    pub async fn shutdown(&self) -> usize {
        let ids = self.active_channels();
        let mut ok = 0;
        for id in &ids {
            match self.unsubscribe(id).await {
                Ok(()) => ok += 1,
                Err(e) => tracing::warn!("⚠️ Unsubscribe {} on shutdown failed: {e}", id),
            }
        }
        ok
    }
}
