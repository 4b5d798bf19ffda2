//! # ytnotify channels
//! Clients for the services the notifier talks to.

pub mod markdown;
pub mod recorder;
pub mod telegram;
pub mod websub;
pub mod youtube;

pub use recorder::HttpRecorder;
pub use telegram::{CallbackData, TelegramBot};
pub use websub::{FeedEntry, FeedEvent, WebSubClient, decode_feed};
pub use youtube::YoutubeApi;
