//! Tight per-video polling while a broadcast is about to start.

use chrono::{TimeDelta, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use ytnotify_core::types::BroadcastState;

use crate::engine::Scheduler;
use crate::tiers::wait_tier;

/// Video ids with a diligent loop in flight.
#[derive(Default)]
pub struct DiligentSet {
    ids: Mutex<HashSet<String>>,
}

impl DiligentSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn ids(&self) -> MutexGuard<'_, HashSet<String>> {
        self.ids.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim an id. `None` if another loop already owns it.
    pub fn try_claim(self: &Arc<Self>, video_id: &str) -> Option<DiligentClaim> {
        if !self.ids().insert(video_id.to_string()) {
            return None;
        }
        Some(DiligentClaim {
            set: Arc::clone(self),
            video_id: video_id.to_string(),
        })
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.ids().contains(video_id)
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ownership of one id in a [`DiligentSet`]; releases it on drop.
pub struct DiligentClaim {
    set: Arc<DiligentSet>,
    video_id: String,
}

impl DiligentClaim {
    pub fn video_id(&self) -> &str {
        &self.video_id
    }
}

impl Drop for DiligentClaim {
    fn drop(&mut self) {
        self.set.ids().remove(&self.video_id);
    }
}

/// Why a diligent loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiligentExit {
    FetchFailed,
    /// Start moved beyond the regular period; the regular loop takes over.
    Rescheduled,
    Live,
    /// Completed, a plain upload, or no scheduled start left to wait for.
    Finished,
}

impl Scheduler {
    /// Poll one video until it goes live, gets rescheduled far out, or the
    /// platform stops answering.
    pub async fn run_diligent(&self, claim: &DiligentClaim) -> DiligentExit {
        let video_id = claim.video_id();
        let config = self.config();
        let tick = Duration::from_secs(config.diligent_tick_secs);
        let tolerance = Duration::from_secs(config.tolerance_secs);
        let warn_every = config.tolerance_warn_every_secs.max(1) as i64;
        let period = TimeDelta::from_std(config.update_frequency()).unwrap_or(TimeDelta::hours(1));
        let mut warned_bucket = None;

        tracing::info!("🔍 Diligent polling started for {}", video_id);
        loop {
            tokio::time::sleep(tick).await;

            let video = match self.api().get_video(video_id).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!("⚠️ Diligent fetch of {} failed: {e}", video_id);
                    return DiligentExit::FetchFailed;
                }
            };

            if let Err(e) = self.notifier().publish(&video).await {
                tracing::error!("❌ Publish {} failed: {e}", video_id);
            }

            let Some(remaining) = video.time_to_start(Utc::now()) else {
                return DiligentExit::Finished;
            };
            if remaining > period {
                tracing::info!(
                    "📅 {} moved {}m out, back to regular polling",
                    video_id,
                    remaining.num_minutes()
                );
                return DiligentExit::Rescheduled;
            }

            match video.broadcast_state() {
                BroadcastState::Live => {
                    self.go_live(video).await;
                    return DiligentExit::Live;
                }
                BroadcastState::Completed | BroadcastState::NotBroadcast => return DiligentExit::Finished,
                BroadcastState::Upcoming => {}
            }

            tokio::time::sleep(wait_tier(remaining)).await;

            if remaining <= TimeDelta::zero() {
                let elapsed = -remaining;
                let bucket = elapsed.num_seconds() / warn_every;
                if warned_bucket != Some(bucket) {
                    tracing::warn!(
                        "⚠️ {} is {}s past its scheduled start and still not live",
                        video_id,
                        elapsed.num_seconds()
                    );
                    warned_bucket = Some(bucket);
                }
                tokio::time::sleep(tolerance).await;
            }
        }
    }
}
