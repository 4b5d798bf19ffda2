//! Per-chat allow/block word lists applied to video titles.

use ytnotify_core::error::Result;
use ytnotify_core::types::{ChatId, FilterRule};
use ytnotify_db::Store;

/// True when the title survives every non-empty rule. A block rule drops a
/// title that contains any word; an allow rule drops one that contains none.
pub fn passes(rules: &[FilterRule], title: &str) -> bool {
    let title = title.to_lowercase();
    rules
        .iter()
        .filter(|rule| !rule.words.is_empty())
        .all(|rule| {
            let matched = rule
                .words
                .iter()
                .any(|w| title.contains(&w.to_lowercase()));
            matched != rule.block
        })
}

/// Load the chat's rules for a channel and test the title against them.
pub fn evaluate(store: &Store, chat_id: ChatId, channel_id: &str, title: &str) -> Result<bool> {
    let rules = store.filters_for(chat_id, channel_id)?;
    let pass = passes(&rules, title);
    if !pass {
        tracing::info!("🚫 Filtered '{}' out for chat {}", title, chat_id);
    }
    Ok(pass)
}
