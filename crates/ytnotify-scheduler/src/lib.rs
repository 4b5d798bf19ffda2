//! # ytnotify scheduler
//! The notification engine: filter gate, per-video state machine, push
//! ingestion, hub subscriptions, recording dispatch and the regular +
//! diligent pollers that drive it all.

pub mod diligent;
pub mod engine;
pub mod filter;
pub mod ingest;
pub mod locks;
pub mod message;
pub mod notifier;
pub mod recording;
pub mod subscriptions;
pub mod tiers;

#[cfg(test)]
pub(crate) mod testing;

pub use diligent::{DiligentClaim, DiligentExit, DiligentSet};
pub use engine::Scheduler;
pub use ingest::FeedIngestor;
pub use notifier::Notifier;
pub use recording::{RecordReply, RecordReport, RecordingService, RequestOutcome};
pub use subscriptions::SubscriptionManager;
