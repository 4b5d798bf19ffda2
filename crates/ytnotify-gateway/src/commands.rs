//! Chat commands: subscriptions, per-channel filters, auto-record and the
//! chat's recorder endpoint.

use ytnotify_channels::markdown::{code, escape, link};
use ytnotify_core::error::YtNotifyError;
use ytnotify_core::types::{CHANNEL_URL_PREFIX, ChatId, FilterRule, RecorderEndpoint};

use crate::server::AppState;

const HELP: &str = "/add <channelId> - subscribe to a channel
/remove <channelId> - unsubscribe
/list - show subscriptions
/filter <channelId> block|allow [word, word] - set or clear a title filter
/autorecord <channelId> on|off - record every live stream of a channel
/recorder <url> <token> - set this chat's recorder
/recorder off - remove it";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(String),
    Remove(String),
    List,
    Filter { channel_id: String, rule: FilterRule },
    AutoRecord { channel_id: String, enabled: bool },
    Recorder(Option<RecorderEndpoint>),
    Help,
}

impl Command {
    /// Parse a message text. Returns `None` for anything that is not a
    /// command. `/cmd@botname` is accepted. Malformed arguments to a known
    /// command yield `Help`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let head = parts.next()?.strip_prefix('/')?;
        let name = head.split('@').next().unwrap_or(head);
        let args: Vec<&str> = parts.collect();

        Some(match (name, args.as_slice()) {
            ("add", [id, ..]) => Command::Add(id.to_string()),
            ("remove", [id, ..]) => Command::Remove(id.to_string()),
            ("list", _) => Command::List,
            ("filter", [id, kind, words @ ..]) => {
                let block = match *kind {
                    "block" => true,
                    "allow" => false,
                    _ => return Some(Command::Help),
                };
                Command::Filter {
                    channel_id: id.to_string(),
                    rule: FilterRule::from_stored(block, &words.join(" ")),
                }
            }
            ("autorecord", [id, "on"]) => Command::AutoRecord {
                channel_id: id.to_string(),
                enabled: true,
            },
            ("autorecord", [id, "off"]) => Command::AutoRecord {
                channel_id: id.to_string(),
                enabled: false,
            },
            ("recorder", ["off"]) => Command::Recorder(None),
            ("recorder", [url, token]) if url.starts_with("http://") || url.starts_with("https://") => {
                Command::Recorder(Some(RecorderEndpoint {
                    url: url.to_string(),
                    token: token.to_string(),
                }))
            }
            ("add" | "remove" | "filter" | "autorecord" | "recorder" | "start" | "help", _) => Command::Help,
            _ => return None,
        })
    }
}

/// Whether the chat subscribes to the channel; per-channel settings need one.
fn subscribed(state: &AppState, chat_id: ChatId, channel_id: &str) -> ytnotify_core::error::Result<bool> {
    Ok(state.store.chats_for_channel(channel_id)?.contains(&chat_id))
}

/// Run a command for a chat and produce the MarkdownV2 reply.
pub async fn execute(state: &AppState, chat_id: ChatId, command: Command) -> String {
    match command {
        Command::Add(channel_id) => match state.subscriptions.add_subscription(chat_id, &channel_id).await {
            Ok(channel) => {
                tracing::info!("➕ Chat {} subscribed to {}", chat_id, channel.id);
                format!("Subscribed to {}", link(&escape(&channel.title), &channel.url()))
            }
            Err(YtNotifyError::NotFound(_)) => format!("Channel {} not found", code(&channel_id)),
            Err(e) => {
                tracing::warn!("⚠️ /add {} for chat {} failed: {e}", channel_id, chat_id);
                escape("Failed to subscribe, try again later.")
            }
        },
        Command::Remove(channel_id) => {
            // Read the title first; GC may drop the channel row right after.
            let title = state
                .store
                .channel_title(&channel_id)
                .ok()
                .flatten()
                .unwrap_or_else(|| channel_id.clone());
            match state.subscriptions.remove_subscription(chat_id, &channel_id) {
                Ok(true) => {
                    tracing::info!("➖ Chat {} unsubscribed from {}", chat_id, channel_id);
                    format!(
                        "Unsubscribed from {}",
                        link(&escape(&title), &format!("{CHANNEL_URL_PREFIX}{channel_id}"))
                    )
                }
                Ok(false) => format!("Not subscribed to {}", code(&channel_id)),
                Err(e) => {
                    tracing::error!("❌ /remove {} for chat {} failed: {e}", channel_id, chat_id);
                    escape("Internal server error.")
                }
            }
        }
        Command::List => match state.store.channels_for_chat(chat_id) {
            Ok(channels) if channels.is_empty() => escape("No subscriptions yet."),
            Ok(channels) => channels
                .iter()
                .map(|c| format!("{} {}", escape("-"), link(&escape(&c.title), &c.url())))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => {
                tracing::error!("❌ /list for chat {} failed: {e}", chat_id);
                escape("Internal server error.")
            }
        },
        Command::Filter { channel_id, rule } => match subscribed(state, chat_id, &channel_id) {
            Ok(false) => format!("Not subscribed to {}", code(&channel_id)),
            Ok(true) => match state.store.set_filter(chat_id, &channel_id, &rule) {
                Ok(()) => {
                    let kind = if rule.block { "Block" } else { "Allow" };
                    tracing::info!("🔧 Chat {} set {} filter on {}", chat_id, kind, channel_id);
                    if rule.words.is_empty() {
                        format!("{} list for {} cleared", kind, code(&channel_id))
                    } else {
                        format!(
                            "{} list for {}: {}",
                            kind,
                            code(&channel_id),
                            escape(&rule.words.join(", "))
                        )
                    }
                }
                Err(e) => {
                    tracing::error!("❌ /filter {} for chat {} failed: {e}", channel_id, chat_id);
                    escape("Internal server error.")
                }
            },
            Err(e) => {
                tracing::error!("❌ /filter {} for chat {} failed: {e}", channel_id, chat_id);
                escape("Internal server error.")
            }
        },
        Command::AutoRecord { channel_id, enabled } => match subscribed(state, chat_id, &channel_id) {
            Ok(false) => format!("Not subscribed to {}", code(&channel_id)),
            Ok(true) => match state.store.set_auto_record(chat_id, &channel_id, enabled) {
                Ok(()) => {
                    tracing::info!("🔧 Chat {} auto-record on {}: {}", chat_id, channel_id, enabled);
                    let state_word = if enabled { "on" } else { "off" };
                    format!("Auto\\-record for {} is {}", code(&channel_id), state_word)
                }
                Err(e) => {
                    tracing::error!("❌ /autorecord {} for chat {} failed: {e}", channel_id, chat_id);
                    escape("Internal server error.")
                }
            },
            Err(e) => {
                tracing::error!("❌ /autorecord {} for chat {} failed: {e}", channel_id, chat_id);
                escape("Internal server error.")
            }
        },
        Command::Recorder(endpoint) => match state.store.set_recorder(chat_id, endpoint.as_ref()) {
            Ok(()) => match endpoint {
                Some(endpoint) => {
                    tracing::info!("🔧 Chat {} set a recorder", chat_id);
                    format!("Recorder set to {}", code(&endpoint.url))
                }
                None => {
                    tracing::info!("🔧 Chat {} removed its recorder", chat_id);
                    escape("Recorder removed.")
                }
            },
            Err(e) => {
                tracing::error!("❌ /recorder for chat {} failed: {e}", chat_id);
                escape("Internal server error.")
            }
        },
        Command::Help => escape(HELP),
    }
}
